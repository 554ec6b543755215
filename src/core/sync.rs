use crate::domain::model::{CanonicalRecord, DedupKey, StoreDocument, WriteOp, WriteSummary};
use crate::domain::ports::DocumentStore;
use crate::utils::error::Result;
use std::collections::HashMap;

/// Stored and incoming prices closer than this are treated as unchanged.
pub const PRICE_EPSILON: f64 = 0.001;

/// Only the price is compared. A record whose subcategory changed but whose
/// price did not is left as stored.
pub fn is_unchanged(existing: &StoreDocument, record: &CanonicalRecord) -> bool {
    (existing.price - record.price).abs() <= PRICE_EPSILON
}

/// Diffs `records` against `existing`. Returns the ops to submit and how many
/// records were skipped as unchanged.
pub fn plan_writes(
    records: Vec<CanonicalRecord>,
    existing: &HashMap<DedupKey, StoreDocument>,
) -> (Vec<WriteOp>, usize) {
    let mut ops = Vec::new();
    let mut unchanged = 0;

    for record in records {
        match existing.get(&record.key()) {
            None => ops.push(WriteOp::Insert(record)),
            Some(doc) if !is_unchanged(doc, &record) => {
                tracing::debug!(
                    "Price of {} changed: {} -> {}",
                    record.key(),
                    doc.price,
                    record.price
                );
                ops.push(WriteOp::Update(record));
            }
            Some(_) => unchanged += 1,
        }
    }

    (ops, unchanged)
}

pub struct Synchronizer<'a, S: DocumentStore> {
    store: &'a S,
    collection: String,
}

impl<'a, S: DocumentStore> Synchronizer<'a, S> {
    pub fn new(store: &'a S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Writes only what differs from the stored collection. With
    /// `full_refresh` the collection is dropped first, so everything is inserted.
    pub async fn sync(
        &self,
        records: Vec<CanonicalRecord>,
        full_refresh: bool,
    ) -> Result<WriteSummary> {
        if full_refresh {
            tracing::info!("Performing full refresh: dropping collection '{}'", self.collection);
            self.store.drop_collection(&self.collection).await?;
        }

        let existing: HashMap<DedupKey, StoreDocument> = self
            .store
            .find_all(&self.collection)
            .await?
            .into_iter()
            .map(|doc| (doc.key(), doc))
            .collect();
        tracing::debug!("Found {} existing documents", existing.len());

        let (ops, unchanged) = plan_writes(records, &existing);

        let mut summary = if ops.is_empty() {
            tracing::info!("No changes detected; skipping updates/inserts.");
            WriteSummary::default()
        } else {
            self.store.bulk_write(&self.collection, ops).await?
        };
        summary.unchanged = unchanged;

        for error in &summary.errors {
            tracing::warn!("{}", error);
        }
        tracing::info!(
            "Load complete: {} inserted, {} updated, {} unchanged, {} failed",
            summary.inserted,
            summary.updated,
            summary.unchanged,
            summary.failed
        );

        Ok(summary)
    }
}
