pub mod api;
pub mod csv_file;
pub mod database;

pub use api::ApiSource;
pub use csv_file::CsvSource;
pub use database::DatabaseSource;

use crate::config::{SourceConfig, SourceKind};
use crate::domain::ports::Source;
use std::sync::Arc;

/// Sources in declaration order. Expects a validated config.
pub fn build_sources(configs: &[SourceConfig]) -> Vec<Arc<dyn Source>> {
    configs
        .iter()
        .map(|config| -> Arc<dyn Source> {
            match config.r#type {
                SourceKind::Api => Arc::new(ApiSource::new(&config.name, config.endpoint.clone())),
                SourceKind::Csv => Arc::new(CsvSource::new(
                    &config.name,
                    config.path.as_deref().unwrap_or("products.csv"),
                )),
                SourceKind::Database => {
                    Arc::new(DatabaseSource::new(&config.name, config.fail_after))
                }
            }
        })
        .collect()
}
