pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::sources::build_sources;
pub use adapters::store::{JsonFileStore, MemoryStore};
pub use config::PipelineConfig;
pub use core::etl::{EtlEngine, RunOptions};
pub use domain::model::{CanonicalRecord, RawRecord, RunReport, StoreDocument, WriteSummary};
pub use domain::ports::{DocumentStore, Source};
pub use utils::error::{EtlError, Result};
