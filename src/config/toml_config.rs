use crate::core::dedupe::DEFAULT_PARTITIONS;
use crate::core::etl::RunOptions;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub pipeline: PipelineInfo,
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub dedupe: DedupeConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Api,
    Csv,
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub r#type: SourceKind,
    pub name: String,
    pub endpoint: Option<String>,
    pub path: Option<String>,
    pub fail_after: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub concurrent: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupeConfig {
    pub partitions: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Json,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub r#type: StoreKind,
    pub path: Option<String>,
    pub database: Option<String>,
    pub collection: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadConfig {
    pub full_refresh: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl Default for PipelineConfig {
    /// The stock run: sample API feed, `products.csv`, simulated database,
    /// JSON store under `./data`.
    fn default() -> Self {
        let source = |kind, name: &str, path: Option<&str>| SourceConfig {
            r#type: kind,
            name: name.to_string(),
            endpoint: None,
            path: path.map(str::to_string),
            fail_after: None,
        };
        Self {
            pipeline: PipelineInfo {
                name: "product-etl".to_string(),
                description: None,
            },
            sources: vec![
                source(SourceKind::Api, "api", None),
                source(SourceKind::Csv, "csv", Some("products.csv")),
                source(SourceKind::Database, "database", None),
            ],
            extract: ExtractConfig::default(),
            dedupe: DedupeConfig::default(),
            store: StoreConfig::default(),
            load: LoadConfig::default(),
            monitoring: None,
        }
    }
}

impl PipelineConfig {
    /// Loads a pipeline definition from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Expands `${VAR}` references. Unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "sources".to_string(),
            });
        }

        let mut names = HashSet::new();
        for (i, source) in self.sources.iter().enumerate() {
            let field = format!("sources[{}]", i);
            validation::validate_non_empty_string(&format!("{}.name", field), &source.name)?;
            if !names.insert(source.name.as_str()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: format!("{}.name", field),
                    value: source.name.clone(),
                    reason: "Source names must be unique".to_string(),
                });
            }

            if let Some(endpoint) = &source.endpoint {
                validation::validate_url(&format!("{}.endpoint", field), endpoint)?;
            }
            if source.r#type == SourceKind::Csv {
                let path =
                    validation::validate_required_field(&format!("{}.path", field), &source.path)?;
                validation::validate_path(&format!("{}.path", field), path)?;
            }
        }

        validation::validate_positive_number("dedupe.partitions", self.partitions(), 1)?;
        validation::validate_path("store.path", self.store_path())?;
        validation::validate_non_empty_string("store.database", self.database())?;
        validation::validate_non_empty_string("store.collection", self.collection())?;

        Ok(())
    }

    pub fn partitions(&self) -> usize {
        self.dedupe.partitions.unwrap_or(DEFAULT_PARTITIONS)
    }

    pub fn store_path(&self) -> &str {
        self.store.path.as_deref().unwrap_or("./data")
    }

    pub fn database(&self) -> &str {
        self.store.database.as_deref().unwrap_or("ecommerceetl")
    }

    pub fn collection(&self) -> &str {
        self.store.collection.as_deref().unwrap_or("products")
    }

    pub fn full_refresh(&self) -> bool {
        self.load.full_refresh.unwrap_or(false)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            collection: self.collection().to_string(),
            partitions: self.partitions(),
            concurrent_extract: self.extract.concurrent.unwrap_or(false),
            full_refresh: self.full_refresh(),
        }
    }
}

impl Validate for PipelineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[pipeline]
name = "nightly-products"

[[sources]]
type = "api"
name = "vendor-feed"
endpoint = "https://api.example.com/products"

[[sources]]
type = "csv"
name = "catalogue"
path = "./products.csv"

[[sources]]
type = "database"
name = "legacy-db"
fail_after = 2

[dedupe]
partitions = 8

[store]
type = "memory"
collection = "items"

[load]
full_refresh = true
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = PipelineConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.pipeline.name, "nightly-products");
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[2].r#type, SourceKind::Database);
        assert_eq!(config.sources[2].fail_after, Some(2));
        assert_eq!(config.store.r#type, StoreKind::Memory);
        assert_eq!(config.database(), "ecommerceetl");

        let options = config.run_options();
        assert_eq!(options.collection, "items");
        assert_eq!(options.partitions, 8);
        assert!(options.full_refresh);
        assert!(!options.concurrent_extract);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.store.r#type, StoreKind::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PRODUCT_ETL_TEST_ENDPOINT", "https://test.api.com/items");

        let config = PipelineConfig::from_toml_str(
            r#"
[pipeline]
name = "env"

[[sources]]
type = "api"
name = "api"
endpoint = "${PRODUCT_ETL_TEST_ENDPOINT}"
"#,
        )
        .unwrap();

        assert_eq!(
            config.sources[0].endpoint.as_deref(),
            Some("https://test.api.com/items")
        );
        std::env::remove_var("PRODUCT_ETL_TEST_ENDPOINT");
    }

    #[test]
    fn test_config_validation() {
        let mut config = PipelineConfig::default();
        config.sources[0].endpoint = Some("invalid-url".to_string());
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.sources[1].path = None;
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));

        let mut config = PipelineConfig::default();
        config.sources[2].name = "api".to_string();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.dedupe.partitions = Some(0);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.sources.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_source_type_is_rejected() {
        let result = PipelineConfig::from_toml_str(
            r#"
[pipeline]
name = "bad"

[[sources]]
type = "ftp"
name = "x"
"#,
        );
        assert!(matches!(result, Err(EtlError::ConfigValidationError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = PipelineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "nightly-products");
    }
}
