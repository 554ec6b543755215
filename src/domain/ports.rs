use crate::domain::model::{RawRecord, StoreDocument, WriteOp, WriteSummary};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Lazy, finite stream of raw records. An `Err` item ends the source.
pub type RecordIter = Box<dyn Iterator<Item = Result<RawRecord>> + Send>;

#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    async fn open(&self) -> Result<RecordIter>;
}

/// Upsert-capable document store. The handle is passed explicitly to
/// whatever needs it and released with [`DocumentStore::close`].
pub trait DocumentStore: Send + Sync {
    fn find_all(
        &self,
        collection: &str,
    ) -> impl std::future::Future<Output = Result<Vec<StoreDocument>>> + Send;

    /// Applies every op independently; a failed op is counted in the summary
    /// and never stops the others.
    fn bulk_write(
        &self,
        collection: &str,
        ops: Vec<WriteOp>,
    ) -> impl std::future::Future<Output = Result<WriteSummary>> + Send;

    fn drop_collection(&self, collection: &str)
        -> impl std::future::Future<Output = Result<()>> + Send;

    fn close(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
