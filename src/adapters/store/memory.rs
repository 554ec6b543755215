use crate::domain::model::{CanonicalRecord, DedupKey, StoreDocument, WriteOp, WriteSummary};
use crate::domain::ports::DocumentStore;
use crate::utils::error::{EtlError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type Collections = HashMap<String, Vec<StoreDocument>>;

/// Applies `ops` to `docs` one at a time. Each op succeeds or fails on its
/// own; `(name, category)` stays unique within the collection.
pub(crate) fn apply_ops(docs: &mut Vec<StoreDocument>, ops: Vec<WriteOp>) -> WriteSummary {
    let mut summary = WriteSummary::default();
    let mut index: HashMap<DedupKey, usize> = docs
        .iter()
        .enumerate()
        .map(|(i, doc)| (doc.key(), i))
        .collect();
    let mut next_id = docs.iter().map(|d| d.id).max().unwrap_or(0) + 1;

    for op in ops {
        let key = op.record().key();
        let existing = index.get(&key).copied();
        match (op, existing) {
            (WriteOp::Insert(record), None) => {
                index.insert(key, docs.len());
                docs.push(new_document(next_id, record));
                next_id += 1;
                summary.inserted += 1;
            }
            (WriteOp::Update(record), Some(i)) => {
                let doc = &mut docs[i];
                doc.name = record.name;
                doc.price = record.price;
                doc.category = record.category;
                doc.subcategory = record.subcategory;
                doc.updated_at = Utc::now();
                summary.updated += 1;
            }
            (WriteOp::Insert(_), Some(_)) => {
                fail(&mut summary, EtlError::write(format!("duplicate key {}", key)));
            }
            (WriteOp::Update(_), None) => {
                fail(&mut summary, EtlError::write(format!("no document with key {}", key)));
            }
        }
    }
    summary
}

fn new_document(id: u64, record: CanonicalRecord) -> StoreDocument {
    let now = Utc::now();
    StoreDocument {
        id,
        name: record.name,
        price: record.price,
        category: record.category,
        subcategory: record.subcategory,
        created_at: now,
        updated_at: now,
    }
}

fn fail(summary: &mut WriteSummary, error: EtlError) {
    summary.failed += 1;
    summary.errors.push(error.to_string());
}

/// Process-local store. Clones share the same collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `docs` into `collection` as-is, replacing its contents.
    pub async fn seed(&self, collection: &str, docs: Vec<StoreDocument>) {
        self.collections
            .write()
            .await
            .insert(collection.to_string(), docs);
    }
}

impl DocumentStore for MemoryStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<StoreDocument>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn bulk_write(&self, collection: &str, ops: Vec<WriteOp>) -> Result<WriteSummary> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        Ok(apply_ops(docs, ops))
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collections.write().await.remove(collection);
        Ok(())
    }
}
