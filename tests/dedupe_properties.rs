use product_etl::core::dedupe::{dedupe, fold_partitions, merge};
use product_etl::domain::model::MergedRecord;
use product_etl::CanonicalRecord;
use proptest::prelude::*;

// Few names and prices so that keys collide and prices tie often.
fn record_strategy() -> impl Strategy<Value = CanonicalRecord> {
    (
        prop::sample::select(vec!["Alpha", "Beta", "Gamma"]),
        prop::sample::select(vec!["tools", "toys"]),
        prop::sample::select(vec![1.0, 2.5, 2.5, 7.0, 10.0]),
        prop::option::of(prop::sample::select(vec!["a", "b", "c"])),
    )
        .prop_map(|(name, category, price, subcategory)| CanonicalRecord {
            name: name.to_string(),
            price,
            category: category.to_string(),
            subcategory: subcategory.map(str::to_string),
        })
}

fn merged(record: &CanonicalRecord) -> MergedRecord {
    MergedRecord::from(record.clone())
}

fn same_key_strategy() -> impl Strategy<Value = CanonicalRecord> {
    record_strategy().prop_map(|mut r| {
        r.name = "Alpha".to_string();
        r.category = "tools".to_string();
        r
    })
}

proptest! {
    #[test]
    fn merge_is_commutative(a in same_key_strategy(), b in same_key_strategy()) {
        prop_assert_eq!(
            merge(Some(merged(&a)), merged(&b)),
            merge(Some(merged(&b)), merged(&a))
        );
    }

    #[test]
    fn merge_is_associative(
        a in same_key_strategy(),
        b in same_key_strategy(),
        c in same_key_strategy(),
    ) {
        let left = merge(Some(merge(Some(merged(&a)), merged(&b))), merged(&c));
        let right = merge(Some(merged(&a)), merge(Some(merged(&b)), merged(&c)));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn dedupe_is_invariant_under_permutation(
        (records, shuffled) in prop::collection::vec(record_strategy(), 0..40)
            .prop_flat_map(|records| {
                let shuffled = Just(records.clone()).prop_shuffle();
                (Just(records), shuffled)
            }),
        partitions in 1usize..8,
    ) {
        prop_assert_eq!(dedupe(records, 4), dedupe(shuffled, partitions));
    }

    #[test]
    fn dedupe_is_invariant_under_repartitioning(
        records in prop::collection::vec(record_strategy(), 0..40),
        assignment in prop::collection::vec(0usize..5, 40),
    ) {
        let mut partitions: Vec<Vec<MergedRecord>> = vec![Vec::new(); 5];
        for (record, &p) in records.iter().zip(&assignment) {
            partitions[p].push(merged(record));
        }

        let mut folded: Vec<CanonicalRecord> =
            fold_partitions(partitions, MergedRecord::key, |a, b| merge(Some(a), b))
                .into_values()
                .map(MergedRecord::into_record)
                .collect();
        folded.sort_by(|a, b| a.key().cmp(&b.key()));

        prop_assert_eq!(folded, dedupe(records, 1));
    }

    #[test]
    fn dedupe_keeps_one_record_per_key_at_the_lowest_price(
        records in prop::collection::vec(record_strategy(), 1..40),
    ) {
        let deduped = dedupe(records.clone(), 3);

        for out in &deduped {
            let min = records
                .iter()
                .filter(|r| r.key() == out.key())
                .map(|r| r.price)
                .fold(f64::INFINITY, f64::min);
            prop_assert_eq!(out.price, min);
        }
        let mut keys: Vec<_> = deduped.iter().map(|r| r.key()).collect();
        keys.dedup();
        prop_assert_eq!(keys.len(), deduped.len());
    }
}
