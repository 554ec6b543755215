use crate::adapters::store::memory::{apply_ops, Collections};
use crate::domain::model::{StoreDocument, WriteOp, WriteSummary};
use crate::domain::ports::DocumentStore;
use crate::utils::error::{EtlError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Collections persisted as pretty-printed JSON arrays under
/// `<base_path>/<database>/<collection>.json`.
///
/// Collections are loaded on first use and cached until [`close`], and every
/// bulk write is flushed to disk before it returns.
///
/// [`close`]: DocumentStore::close
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    cache: Mutex<Collections>,
}

impl JsonFileStore {
    pub fn new(base_path: impl AsRef<Path>, database: &str) -> Self {
        Self {
            dir: base_path.as_ref().join(database),
            cache: Mutex::new(Collections::new()),
        }
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}.json", collection))
    }

    fn load(&self, collection: &str) -> Result<Vec<StoreDocument>> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read(&path)?;
        serde_json::from_slice(&data).map_err(|e| {
            EtlError::store(format!("{} is not a valid collection file: {}", path.display(), e))
        })
    }

    fn persist(&self, collection: &str, docs: &[StoreDocument]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec_pretty(docs)?;
        fs::write(self.collection_path(collection), data)?;
        Ok(())
    }

    async fn with_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Vec<StoreDocument>) -> T,
    ) -> Result<T> {
        let mut cache = self.cache.lock().await;
        if !cache.contains_key(collection) {
            let docs = self.load(collection)?;
            cache.insert(collection.to_string(), docs);
        }
        let docs = cache.entry(collection.to_string()).or_default();
        Ok(f(docs))
    }
}

impl DocumentStore for JsonFileStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<StoreDocument>> {
        self.with_collection(collection, |docs| docs.clone()).await
    }

    async fn bulk_write(&self, collection: &str, ops: Vec<WriteOp>) -> Result<WriteSummary> {
        let (summary, docs) = self
            .with_collection(collection, |docs| (apply_ops(docs, ops), docs.clone()))
            .await?;
        self.persist(collection, &docs)?;
        tracing::debug!(
            "Wrote {} documents to {}",
            docs.len(),
            self.collection_path(collection).display()
        );
        Ok(summary)
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.cache.lock().await.remove(collection);
        let path = self.collection_path(collection);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.cache.lock().await.clear();
        tracing::debug!("Closed document store at {}", self.dir.display());
        Ok(())
    }
}
