use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A record as a source produced it. Shape and types vary per source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub data: HashMap<String, serde_json::Value>,
}

impl RawRecord {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.data.get(field)
    }
}

impl<K: Into<String>> FromIterator<(K, serde_json::Value)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, serde_json::Value)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A product in canonical shape: title-cased name, lower-cased category,
/// finite non-negative price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub name: String,
    pub price: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

impl CanonicalRecord {
    pub fn key(&self) -> DedupKey {
        DedupKey::new(&self.name, &self.category)
    }

    /// Total order used to pick the surviving record of a merge: lower price
    /// first, then records carrying a subcategory, then the smaller subcategory.
    pub fn merge_order(&self, other: &Self) -> Ordering {
        self.price
            .total_cmp(&other.price)
            .then_with(|| match (&self.subcategory, &other.subcategory) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.category.cmp(&other.category))
    }
}

/// Identity of a logical product: `(name, category)` after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DedupKey(pub String, pub String);

impl DedupKey {
    pub fn new(name: &str, category: &str) -> Self {
        Self(name.to_string(), category.to_string())
    }
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Fold accumulator for every record sharing a [`DedupKey`].
///
/// `winner` is the minimum record under [`CanonicalRecord::merge_order`].
/// `backfill` is the subcategory of the cheapest record that has one, kept
/// with its price so it can be compared against later operands.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    winner: CanonicalRecord,
    backfill: Option<(f64, String)>,
}

impl MergedRecord {
    pub fn key(&self) -> DedupKey {
        self.winner.key()
    }

    /// The merged product: the winning record with its subcategory backfilled
    /// when it has none of its own.
    pub fn into_record(self) -> CanonicalRecord {
        let MergedRecord { mut winner, backfill } = self;
        if winner.subcategory.is_none() {
            winner.subcategory = backfill.map(|(_, sub)| sub);
        }
        winner
    }

    pub(crate) fn from_parts(winner: CanonicalRecord, backfill: Option<(f64, String)>) -> Self {
        Self { winner, backfill }
    }

    pub(crate) fn into_parts(self) -> (CanonicalRecord, Option<(f64, String)>) {
        (self.winner, self.backfill)
    }
}

impl From<CanonicalRecord> for MergedRecord {
    fn from(record: CanonicalRecord) -> Self {
        let backfill = record.subcategory.clone().map(|sub| (record.price, sub));
        Self {
            winner: record,
            backfill,
        }
    }
}

/// A product as persisted, with store-assigned identity and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoreDocument {
    pub fn key(&self) -> DedupKey {
        DedupKey::new(&self.name, &self.category)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert(CanonicalRecord),
    /// Replaces every field of the document with the same key.
    Update(CanonicalRecord),
}

impl WriteOp {
    pub fn record(&self) -> &CanonicalRecord {
        match self {
            WriteOp::Insert(record) | WriteOp::Update(record) => record,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// A source that stopped early, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub source_name: String,
    pub message: String,
    /// Records the source had already yielded; they stay in the run.
    pub records_kept: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub extracted: usize,
    pub normalized: usize,
    pub rejected: usize,
    pub deduplicated: usize,
    pub source_failures: Vec<SourceFailure>,
    pub summary: Option<WriteSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(price: f64, subcategory: Option<&str>) -> CanonicalRecord {
        CanonicalRecord {
            name: "X".to_string(),
            price,
            category: "c".to_string(),
            subcategory: subcategory.map(str::to_string),
        }
    }

    #[test]
    fn test_merge_order_prefers_lower_price_then_subcategory() {
        assert_eq!(record(8.0, None).merge_order(&record(10.0, Some("a"))), Ordering::Less);
        assert_eq!(record(8.0, Some("z")).merge_order(&record(8.0, None)), Ordering::Less);
        assert_eq!(record(8.0, Some("a")).merge_order(&record(8.0, Some("b"))), Ordering::Less);
    }

    #[test]
    fn test_canonical_record_omits_absent_subcategory() {
        let json = serde_json::to_value(record(1.5, None)).unwrap();
        assert!(json.get("subcategory").is_none());
        assert_eq!(json["price"], 1.5);
    }
}
