use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;
use weighted_maps::{AutoMap, Map, SumTreeTable};

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_map_accumulate(c: &mut Criterion) {
    c.bench_function("map_accumulate_10k", |b| {
        let keys: Vec<_> = lcg(1).take(1_000).map(key).collect();
        b.iter_batched(
            Map::<String, u64>::new,
            |mut m| {
                for (i, k) in keys.iter().cycle().take(10_000).enumerate() {
                    *m.at(k.clone()) += i as u64;
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

// Counters that rise and fall back to zero: every key is created and
// removed many times over through the stub commit.
fn bench_automap_churn(c: &mut Criterion) {
    c.bench_function("automap_churn_10k", |b| {
        let keys: Vec<u64> = lcg(3).take(10_000).map(|x| x % 512).collect();
        b.iter_batched(
            AutoMap::<u64, i64>::new,
            |mut m| {
                for (i, &k) in keys.iter().enumerate() {
                    *m.at(k) += if i % 2 == 0 { 1 } else { -1 };
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_weighted_automap_churn(c: &mut Criterion) {
    c.bench_function("weighted_automap_churn_10k", |b| {
        let keys: Vec<u64> = lcg(5).take(10_000).map(|x| x % 512).collect();
        b.iter_batched(
            AutoMap::<u64, u64, SumTreeTable<u64>>::new,
            |mut m| {
                for &k in &keys {
                    let mut s = m.at(k);
                    if *s >= 3 {
                        *s = 0;
                    } else {
                        *s += 1;
                    }
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_automap_get_miss(c: &mut Criterion) {
    c.bench_function("automap_get_miss", |b| {
        let mut m: AutoMap<String, u64> = AutoMap::new();
        for (i, x) in lcg(11).take(10_000).enumerate() {
            m.set_value(key(x), i as u64 + 1);
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            let k = key(miss.next().unwrap());
            black_box(m.get(&k));
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_map_accumulate, bench_automap_churn, bench_weighted_automap_churn, bench_automap_get_miss
}
criterion_main!(benches);
