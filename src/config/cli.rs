use crate::config::toml_config::{MonitoringConfig, PipelineConfig};
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "product-etl")]
#[command(about = "Deduplicate products from several sources and sync them into a document store")]
pub struct CliConfig {
    /// Path to a TOML pipeline configuration; the stock three-source run is
    /// used when omitted
    #[arg(short, long)]
    pub config: Option<String>,

    /// Drop the target collection before loading
    #[arg(long)]
    pub full_refresh: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log memory and timing after each stage
    #[arg(long)]
    pub monitor: bool,

    /// Validate the configuration and print the plan without touching the store
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// Loads the configured pipeline and applies command-line overrides.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if self.full_refresh {
            config.load.full_refresh = Some(true);
        }
        if self.monitor {
            config.monitoring = Some(MonitoringConfig { enabled: true });
        }
        Ok(config)
    }
}
