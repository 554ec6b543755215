pub mod dedupe;
pub mod etl;
pub mod extract;
pub mod normalize;
pub mod sync;

pub use crate::domain::model::{CanonicalRecord, MergedRecord, RawRecord, WriteSummary};
pub use crate::domain::ports::{DocumentStore, Source};
pub use crate::utils::error::Result;
