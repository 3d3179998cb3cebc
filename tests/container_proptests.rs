use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use weighted_maps::{AutoMap, Map, Set, SumTreeTable};

// Property: Set membership equals the net put/remove history of each key and
// the size equals the number of present keys.
proptest! {
    #[test]
    fn prop_set_membership_parity(ops in proptest::collection::vec((any::<bool>(), 0u8..16), 1..120)) {
        let mut s: Set<u8> = Set::new();
        let mut model = BTreeSet::new();
        for (put, k) in ops {
            if put {
                prop_assert_eq!(s.put(k), !model.insert(k));
            } else {
                prop_assert_eq!(s.remove(&k), model.remove(&k));
            }
            prop_assert_eq!(s.contains(&k), model.contains(&k));
        }
        prop_assert_eq!(s.len(), model.len());
        prop_assert!(model.iter().all(|k| s.contains(k)));
        prop_assert!(s.is_legal());
    }
}

// Property: once a stub's scope ends, the key is present exactly when the
// last value written differs from the default, for every write path.
proptest! {
    #[test]
    fn prop_automap_presence_follows_value(
        ops in proptest::collection::vec((0u8..3, 0u8..12, -3i32..=3), 1..150)
    ) {
        let mut am: AutoMap<u8, i32> = AutoMap::new();
        let mut model: BTreeMap<u8, i32> = BTreeMap::new();
        for (how, k, v) in ops {
            let next = match how {
                0 => {
                    *am.at(k) = v;
                    v
                }
                1 => {
                    *am.at(k) += v;
                    model.get(&k).copied().unwrap_or_default() + v
                }
                _ => {
                    am.set_value(k, v);
                    v
                }
            };
            model.insert(k, next);
            prop_assert_eq!(am.contains_key(&k), next != 0);
            prop_assert_eq!(am.get(&k), next);
        }
        prop_assert_eq!(am.len(), model.values().filter(|v| **v != 0).count());
        prop_assert!(am.is_legal());
    }
}

// Property: a cursor pass never yields a default-valued entry, even when
// values are forced to the default mid-pass, and leaves none behind.
proptest! {
    #[test]
    fn prop_autocursor_skips_defaults(
        init in proptest::collection::btree_map(0u16..64, 1i32..5, 0..40),
        zero_every in 1usize..5,
    ) {
        let mut am: AutoMap<u16, i32> = init.clone().into_iter().collect();
        let mut visited = BTreeSet::new();
        {
            let mut c = am.cursor();
            let mut step = 0;
            while !c.finished() {
                prop_assert_ne!(*c.value(), 0);
                prop_assert!(visited.insert(*c.key()), "key visited twice");
                if step % zero_every == 0 {
                    *c.value_mut() = 0;
                }
                step += 1;
                c.advance();
            }
        }
        prop_assert_eq!(visited.len(), init.len());
        prop_assert!(am.iter().all(|(_, v)| *v != 0));
        prop_assert_eq!(am.len(), init.len() - init.len().div_ceil(zero_every));
        prop_assert!(am.is_legal());
    }
}

// Property: after any mutation sequence, a sum-tree table's aggregate equals
// the sum of the present values' weights.
proptest! {
    #[test]
    fn prop_weighted_total_matches(
        ops in proptest::collection::vec((0u8..4, 0u16..40, 0u32..1000), 1..200)
    ) {
        let mut m: Map<u16, u32, SumTreeTable<u32>> = Map::new();
        let mut am: AutoMap<u16, u32, SumTreeTable<u32>> = AutoMap::new();
        for (how, k, v) in ops {
            match how {
                0 => {
                    *m.at(k) = v;
                    *am.at(k) = v;
                }
                1 => {
                    m.set_value(k, v);
                    am.at(k).set(v);
                }
                2 => {
                    m.remove(&k);
                    am.remove(&k);
                }
                _ => {
                    *m.at(k) += v;
                    *am.at(k) += v;
                }
            }
            prop_assert_eq!(m.total_weight(), m.values().map(|&v| u64::from(v)).sum::<u64>());
            prop_assert_eq!(am.total_weight(), m.total_weight());
        }
        prop_assert!(m.is_legal());
        prop_assert!(am.is_legal());
    }
}
