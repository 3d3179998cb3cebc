#![cfg(test)]

// Property tests for HashIndex kept inside the crate so they can reach
// crate-private table access.

use crate::index::HashIndex;
use crate::sum_tree::SumTreeTable;
use crate::table::Table;
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::rc::Rc;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations: indices shrink to earlier keys, the pool shrinks,
// and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    ForcedFind(usize, u32),
    Remove(usize),
    Find(usize),
    Contains(String),
    Add(usize, u32),
    SweepBelow(u32),
    Trim,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            (idx.clone(), 0u32..1000).prop_map(|(i, v)| Op::ForcedFind(i, v)),
            idx.clone().prop_map(Op::Remove),
            idx.clone().prop_map(Op::Find),
            prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(Op::Contains),
            (idx.clone(), 0u32..100).prop_map(|(i, d)| Op::Add(i, d)),
            (0u32..500).prop_map(Op::SweepBelow),
            Just(Op::Trim),
            Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run<S: BuildHasher>(
    mut sut: HashIndex<Key, SumTreeTable<u32>, S>,
    pool: Vec<String>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, u32> = HashMap::new();
    let init_calls = Rc::new(Cell::new(0));

    for op in ops {
        match op {
            Op::ForcedFind(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let counter = init_calls.clone();
                let before = counter.get();
                let (existed, loc) = sut.forced_find_with(k.clone(), move || {
                    counter.set(counter.get() + 1);
                    v
                });
                prop_assert_eq!(existed, already);
                prop_assert_eq!(init_calls.get(), before + usize::from(!already));
                prop_assert_eq!(sut.key_at(loc), &k);
                model.entry(k).or_insert(v);
            }
            Op::Remove(i) => {
                let k = key_from(&pool, i);
                match sut.remove(&k) {
                    Some((kk, vv)) => {
                        prop_assert!(kk == k);
                        prop_assert_eq!(Some(vv), model.remove(&k));
                    }
                    None => prop_assert!(!model.contains_key(&k)),
                }
            }
            Op::Find(i) => {
                let k = key_from(&pool, i);
                let found = sut.find(&k);
                prop_assert_eq!(found.is_some(), model.contains_key(&k));
                if let Some(loc) = found {
                    prop_assert_eq!(sut.entry_at(loc), (&k, &model[&k]));
                }
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains(s.as_str()), has_model);
            }
            Op::Add(i, d) => {
                let k = key_from(&pool, i);
                if let Some(loc) = sut.find(&k) {
                    let table = sut.table_mut();
                    *table.raw_mut(loc) += d;
                    table.commit(loc);
                    *model.get_mut(&k).expect("present in model") += d;
                }
            }
            Op::SweepBelow(limit) => {
                let mut c = sut.cursor();
                while !c.finished() {
                    if *c.value() < limit {
                        let (k, _) = c.remove();
                        model.remove(&k);
                    } else {
                        c.advance();
                    }
                }
            }
            Op::Trim => {
                sut.trim();
                let cap = sut.capacity();
                sut.trim();
                prop_assert_eq!(sut.capacity(), cap, "trim must be idempotent");
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.table().total(), model.values().map(|&v| u64::from(v)).sum::<u64>());
        prop_assert!(sut.is_legal());
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// - `forced_find` reports prior presence and runs its initializer only on a miss.
// - `remove` returns the owned `(K, V)` matching the model.
// - Cursor removal visits and removes exactly the matching entries.
// - The sum tree's total equals the model's value sum after every step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(HashIndex::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution
// and slot re-pointing when every entry shares one hash.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run(HashIndex::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}
