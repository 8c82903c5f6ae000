//! Property-based tests for the B+Tree index.
//!
//! Uses proptest to verify invariants across randomized insert sequences:
//! - A full scan returns every inserted entry in non-decreasing key order
//! - The verifier accepts every tree built by insertion
//! - Range scans agree with a filtered, sorted model
//! - Dense runs of equal keys keep both properties, with equal keys in
//!   insertion order

use badger_btree::{AttrType, BTreeIndex, IndexConfig, MemoryRelation, Operator, RecordId};
use proptest::prelude::*;
use tempfile::{tempdir, TempDir};

fn build(keys: &[i32], leaf: usize, internal: usize, pool: usize) -> (BTreeIndex, TempDir) {
    let dir = tempdir().unwrap();
    let config = IndexConfig::new(dir.path())
        .with_pool_size(pool)
        .with_leaf_capacity(leaf)
        .with_internal_capacity(internal);
    let mut index =
        BTreeIndex::open_or_create(&config, "prop", 0, AttrType::Integer, &mut MemoryRelation::new())
            .unwrap();
    for (i, &key) in keys.iter().enumerate() {
        index.insert(key, RecordId::new(i as u32, 0)).unwrap();
    }
    (index, dir)
}

/// `(key, insertion position)` pairs sorted the way a scan returns them.
fn model(keys: &[i32]) -> Vec<(i32, u32)> {
    let mut entries: Vec<(i32, u32)> = keys.iter().enumerate().map(|(i, &k)| (k, i as u32)).collect();
    // Stable sort keeps equal keys in insertion order.
    entries.sort_by_key(|&(k, _)| k);
    entries
}

/// Record positions a scan over the given bounds should return, in order.
fn expected(keys: &[i32], low: i32, low_op: Operator, high: i32, high_op: Operator) -> Vec<u32> {
    model(keys)
        .into_iter()
        .filter(|&(k, _)| low_op.admits(k, low) && high_op.admits(k, high))
        .map(|(_, pos)| pos)
        .collect()
}

fn lower_op() -> impl Strategy<Value = Operator> {
    prop_oneof![Just(Operator::Gt), Just(Operator::Gte)]
}

fn upper_op() -> impl Strategy<Value = Operator> {
    prop_oneof![Just(Operator::Lt), Just(Operator::Lte)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn full_scan_is_sorted_and_complete(
        keys in prop::collection::vec(-50i32..50, 0..300),
        leaf in 2usize..6,
        internal in 2usize..6,
    ) {
        let (mut index, _dir) = build(&keys, leaf, internal, 16);

        let shape = index.verify().unwrap();
        prop_assert_eq!(shape.entry_count, keys.len());

        let got: Vec<u32> = index
            .scan(i32::MIN, Operator::Gte, i32::MAX, Operator::Lte)
            .unwrap()
            .map(|r| r.unwrap().page_number)
            .collect();
        let expected: Vec<u32> = model(&keys).into_iter().map(|(_, pos)| pos).collect();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(index.buffer_pool().pinned_frame_count(), 0);
    }

    #[test]
    fn range_scan_matches_model(
        keys in prop::collection::vec(-100i32..100, 1..200),
        low in -110i32..110,
        width in 0i32..80,
        low_op in lower_op(),
        high_op in upper_op(),
    ) {
        let high = low + width;
        let (mut index, _dir) = build(&keys, 3, 3, 16);

        let want = expected(&keys, low, low_op, high, high_op);

        match index.start_scan(low, low_op, high, high_op) {
            Ok(()) => {
                let mut got = Vec::new();
                while let Ok(rid) = index.scan_next() {
                    got.push(rid.page_number);
                }
                index.end_scan().unwrap();
                prop_assert_eq!(got, want);
            }
            Err(badger_btree::Error::NoSuchKey) => prop_assert!(want.is_empty()),
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }
}

proptest! {
    // Every bound pair is scanned per case, so fewer cases.
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn dense_duplicates_keep_order_and_shape(
        keys in prop::collection::vec(-8i32..8, 0..400),
        leaf in 2usize..5,
        internal in 2usize..5,
    ) {
        let (mut index, _dir) = build(&keys, leaf, internal, 8);

        let shape = index.verify().unwrap();
        prop_assert_eq!(shape.entry_count, keys.len());

        for low in -9..9 {
            for high in low..9 {
                for low_op in [Operator::Gte, Operator::Gt] {
                    for high_op in [Operator::Lte, Operator::Lt] {
                        let got: Vec<u32> = index
                            .scan(low, low_op, high, high_op)
                            .unwrap()
                            .map(|r| r.unwrap().page_number)
                            .collect();
                        prop_assert_eq!(got, expected(&keys, low, low_op, high, high_op));
                    }
                }
            }
        }
        prop_assert_eq!(index.buffer_pool().pinned_frame_count(), 0);
    }
}
