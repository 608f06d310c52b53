use super::{AvlTree, TreeError};

use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(i16, u32),
    Remove(i16),
    Search(i16),
}

fn key_strategy() -> impl Strategy<Value = i16> + Clone {
    // A narrow key range makes upserts and hits on remove common.
    -256i16..256
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        30 => key.clone().prop_map(Op::Remove),
        20 => key.prop_map(Op::Search),
    ];
    prop::collection::vec(op, 0..=1000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_btreemap(ops in ops_strategy()) {
        let mut t: AvlTree<i16, u32> = AvlTree::new();
        let mut m: BTreeMap<i16, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    t.insert(key, value);
                    m.insert(key, value);
                    prop_assert_eq!(t.search(&key), Ok(&value));
                }
                Op::Remove(key) => {
                    let old_t = t.remove(&key);
                    let old_m = m.remove(&key).ok_or(TreeError::NotFound);
                    prop_assert_eq!(old_t, old_m);
                    prop_assert_eq!(t.search(&key), Err(TreeError::NotFound));
                }
                Op::Search(key) => {
                    let got_t = t.search(&key).copied();
                    let got_m = m.get(&key).copied().ok_or(TreeError::NotFound);
                    prop_assert_eq!(got_t, got_m);
                }
            }

            prop_assert_eq!(t.len(), m.len());
            t.check_consistency();
        }

        let got: Vec<u32> = t.in_order().into_iter().copied().collect();
        let expected: Vec<u32> = m.values().copied().collect();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(t.min().map(|(k, v)| (*k, *v)), m.first_key_value().map(|(k, v)| (*k, *v)));
        prop_assert_eq!(t.max().map(|(k, v)| (*k, *v)), m.last_key_value().map(|(k, v)| (*k, *v)));
    }

    #[test]
    fn prop_traversals_permute_in_order(keys in prop::collection::vec(key_strategy(), 0..=500)) {
        let mut t = AvlTree::new();
        for key in &keys {
            t.insert(*key, i32::from(*key));
        }
        t.check_consistency();

        let in_order = t.in_order();
        prop_assert_eq!(in_order.len(), t.len());
        prop_assert!(in_order.windows(2).all(|pair| pair[0] < pair[1]));

        let mut pre_order = t.pre_order();
        let mut post_order = t.post_order();
        pre_order.sort();
        post_order.sort();
        prop_assert_eq!(&pre_order, &in_order);
        prop_assert_eq!(&post_order, &in_order);
    }

    #[test]
    fn prop_level_view_shape(keys in prop::collection::vec(key_strategy(), 0..=100), rows in 1usize..=6) {
        let mut t = AvlTree::new();
        for key in &keys {
            t.insert(*key, ());
        }

        let levels = t.level_view(rows);
        prop_assert_eq!(levels.len(), rows);
        for (row, slots) in levels.iter().enumerate() {
            prop_assert_eq!(slots.len(), 1 << row);
        }
        let top = levels[0][0].map(|(k, _)| *k);
        prop_assert_eq!(top, t.root().map(|(k, _)| *k));
    }
}
