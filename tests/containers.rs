use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use weighted_maps::{AutoMap, BoolAutoMap, Map, Set, SumTreeTable, Uniform, Weighted};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

#[test]
fn map_subscript_accumulates() {
    let mut m: Map<String, i32> = Map::new();
    *m.at("a".into()) += 3;
    *m.at("a".into()) += 4;
    assert_eq!(m["a"], 7);
}

#[test]
fn automap_default_write_removes() {
    let mut am: AutoMap<String, i32> = AutoMap::new();
    *am.at("x".into()) = 5;
    *am.at("x".into()) = 0;
    assert!(!am.contains_key("x"));
    assert_eq!(am.len(), 0);
}

#[test]
fn set_put_reports_duplicates() {
    let mut s: Set<i32> = Set::new();
    assert!(!s.put(5));
    assert!(s.put(5));
    assert_eq!(s.len(), 1);
}

// Property: a fresh Map key reads the table's cleared value before any write.
#[test]
fn map_fresh_key_reads_default() {
    let mut m: Map<u64, Vec<u8>> = Map::new();
    assert!(m.at(1).is_empty());
    let mut w: Map<u64, f64, SumTreeTable<f64>> = Map::new();
    assert_eq!(*w.at(1), 0.0);
    assert_eq!(w.total_weight(), 0.0);
}

// Property: writing a value then the default leaves the key absent, whichever
// write path is used.
#[test]
fn automap_value_then_default_is_absent() {
    let mut am: AutoMap<&str, u32, SumTreeTable<u32>> = AutoMap::new();
    am.at("k").set(9);
    am.at("k").set(0);
    assert!(!am.contains_key("k"));

    am.set_value("k", 9);
    am.set_value("k", 0);
    assert!(!am.contains_key("k"));

    *am.at("k") = 9;
    *am.at("k") = 0;
    assert!(!am.contains_key("k"));
    assert_eq!(am.total_weight(), 0);
    assert!(am.is_legal());
}

// Property: for bool values membership tracks the last write, and the size
// counts true keys.
#[test]
fn bool_automap_tracks_truth() {
    let mut m: BoolAutoMap<u32> = BoolAutoMap::new();
    let mut model = HashMap::new();
    for (k, v) in [(1, true), (2, true), (1, false), (3, true), (2, true), (4, false)] {
        m.at(k).set(v);
        model.insert(k, v);
        assert_eq!(m.contains_key(&k), v);
    }
    assert_eq!(m.len(), model.values().filter(|v| **v).count());
    assert!(m.is_legal());
}

#[test]
fn read_only_get_never_allocates() {
    let mut am: AutoMap<u32, i64> = AutoMap::new();
    for k in 0..100 {
        assert_eq!(am.get(&k), 0);
        assert_eq!(*am.at(k), 0);
    }
    assert!(am.is_empty());
}

// Sampling from a sum tree whose entries appear and vanish through stubs
// only ever returns entries with positive weight, and roughly in proportion.
#[test]
fn sampling_under_churn() {
    init_tracing();
    let mut am: AutoMap<u32, u64, SumTreeTable<u64>> = AutoMap::new();
    for round in 0..200u32 {
        *am.at(round % 13) += 1;
        if round % 3 == 0 {
            let k = (round / 3) % 13;
            let v = am.get(&k);
            *am.at(k) -= v;
        }
    }
    am.set_value(100, 1_000_000);
    assert!(am.is_legal());

    let mut rng = StdRng::seed_from_u64(5);
    let mut heavy = 0;
    for _ in 0..1000 {
        let (k, v) = am.sample(&mut rng).expect("non-empty");
        assert!(*v > 0);
        if *k == 100 {
            heavy += 1;
        }
    }
    assert!(heavy > 950, "heavy entry drawn {heavy} times");
}

// An outer sum tree over Sets samples each set by its element count.
#[test]
fn nested_sets_weigh_by_size() {
    let mut outer: AutoMap<&str, Set<u32>, SumTreeTable<Set<u32>>> = AutoMap::new();
    outer.at("small").put(1);
    outer.at("big").accumulate(0..9);
    assert_eq!(outer.total_weight(), 10);
    outer.at("small").remove(&1);
    assert!(!outer.contains_key("small"));
    assert_eq!(outer.total_weight(), 9);
    assert_eq!(outer.get_ref("big").map(Weighted::weight), Some(9));
    assert!(outer.is_legal());
}

// The Uniform policy ignores stored magnitudes.
#[test]
fn uniform_policy_counts_entries() {
    let mut m: Map<u32, u64, SumTreeTable<u64, Uniform>> = Map::new();
    m.set_value(1, 1000);
    m.set_value(2, 1);
    assert_eq!(m.total_weight(), 2);
    assert_eq!(m.pick(1), Some((&2, &1)));
}

#[test]
fn deferred_stub_spans_statements() {
    let mut am: AutoMap<u8, i32> = AutoMap::new();
    let mut s = am.deferred(4);
    *s += 10;
    *s *= 3;
    assert_eq!(*s, 30);
    s.finalize();
    assert_eq!(am.get(&4), 30);
}

#[test]
fn automaps_nest_and_compare() {
    let mut a: AutoMap<u8, AutoMap<u8, i32>> = AutoMap::new();
    let mut b: AutoMap<u8, AutoMap<u8, i32>> = AutoMap::new();
    *a.at(1).at(2) += 5;
    b.at(1).set_value(2, 5);
    assert_eq!(a, b);
    *b.at(1).at(2) -= 5;
    assert!(b.is_empty());
    assert_ne!(a, b);
}
