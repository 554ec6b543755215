//! Key-grouped fold over arbitrarily partitioned input.
//!
//! Partitions are folded in parallel on the rayon pool and their per-key
//! results are combined pairwise in whatever order rayon's reduce tree picks.
//! The result is only well defined because the operator is commutative and
//! associative; [`merge`] is the one used for products.

use crate::domain::model::{CanonicalRecord, DedupKey, MergedRecord};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

pub const DEFAULT_PARTITIONS: usize = 4;

/// Groups `items` by `key_fn` and folds each group with `op`.
///
/// `op` must satisfy, for all `a`, `b`, `c` with equal keys:
/// - `op(a, b) == op(b, a)`
/// - `op(op(a, b), c) == op(a, op(b, c))`
///
/// The input is split into `partitions` contiguous chunks; the split is an
/// implementation detail callers must not rely on.
pub fn reduce_by_key<T, K, KF, F>(
    items: Vec<T>,
    partitions: usize,
    key_fn: KF,
    op: F,
) -> HashMap<K, T>
where
    T: Send,
    K: Eq + Hash + Send,
    KF: Fn(&T) -> K + Sync,
    F: Fn(T, T) -> T + Sync,
{
    fold_partitions(split(items, partitions), key_fn, op)
}

/// Same as [`reduce_by_key`] with the partitioning supplied by the caller.
pub fn fold_partitions<T, K, KF, F>(partitions: Vec<Vec<T>>, key_fn: KF, op: F) -> HashMap<K, T>
where
    T: Send,
    K: Eq + Hash + Send,
    KF: Fn(&T) -> K + Sync,
    F: Fn(T, T) -> T + Sync,
{
    partitions
        .into_par_iter()
        .map(|partition| {
            let mut groups = HashMap::new();
            for item in partition {
                insert_with(&mut groups, key_fn(&item), item, &op);
            }
            groups
        })
        .reduce(HashMap::new, |mut left, right| {
            for (key, item) in right {
                insert_with(&mut left, key, item, &op);
            }
            left
        })
}

fn insert_with<T, K, F>(groups: &mut HashMap<K, T>, key: K, item: T, op: &F)
where
    K: Eq + Hash,
    F: Fn(T, T) -> T,
{
    let folded = match groups.remove(&key) {
        Some(acc) => op(acc, item),
        None => item,
    };
    groups.insert(key, folded);
}

fn split<T>(items: Vec<T>, partitions: usize) -> Vec<Vec<T>> {
    let partitions = partitions.max(1);
    let chunk = items.len().div_ceil(partitions).max(1);
    let mut out: Vec<Vec<T>> = Vec::with_capacity(partitions);
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        out.push(iter.by_ref().take(chunk).collect());
    }
    out
}

/// Merge operator for records sharing a [`DedupKey`].
///
/// The cheaper record wins. If the winner has no subcategory it takes the
/// subcategory of the cheapest record that has one. `None` is the identity.
pub fn merge(acc: Option<MergedRecord>, record: MergedRecord) -> MergedRecord {
    match acc {
        None => record,
        Some(acc) => merge_pair(acc, record),
    }
}

fn merge_pair(a: MergedRecord, b: MergedRecord) -> MergedRecord {
    let (winner_a, backfill_a) = a.into_parts();
    let (winner_b, backfill_b) = b.into_parts();

    let winner = match winner_a.merge_order(&winner_b) {
        Ordering::Greater => winner_b,
        _ => winner_a,
    };
    let backfill = match (backfill_a, backfill_b) {
        (Some(x), Some(y)) => {
            let ord = x.0.total_cmp(&y.0).then_with(|| x.1.cmp(&y.1));
            Some(if ord == Ordering::Greater { y } else { x })
        }
        (x, y) => x.or(y),
    };

    MergedRecord::from_parts(winner, backfill)
}

/// One record per `(name, category)`, sorted by key.
pub fn dedupe(records: Vec<CanonicalRecord>, partitions: usize) -> Vec<CanonicalRecord> {
    let merged: Vec<MergedRecord> = records.into_iter().map(MergedRecord::from).collect();
    let groups = reduce_by_key(merged, partitions, MergedRecord::key, |a, b| {
        merge(Some(a), b)
    });

    let mut out: Vec<(DedupKey, CanonicalRecord)> = groups
        .into_iter()
        .map(|(key, merged)| (key, merged.into_record()))
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));

    tracing::debug!(
        "Deduplicated into {} records across {} partitions",
        out.len(),
        partitions
    );
    out.into_iter().map(|(_, record)| record).collect()
}
