use coalesced_hashmap::{CoalescedHashMap, InsertionMode};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("coalesced_insert_10k", |b| {
        b.iter_batched(
            || CoalescedHashMap::<u64, u64>::new(10_000).unwrap(),
            |mut m| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    black_box(m.insert(x, i as u64));
                }
                m
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_modes(c: &mut Criterion) {
    let modes = [
        ("lisch", InsertionMode::Lisch),
        ("eisch", InsertionMode::Eisch),
        ("lich", InsertionMode::Lich),
        ("eich", InsertionMode::Eich),
        ("vich", InsertionMode::Vich),
    ];
    for (name, mode) in modes {
        // 5k keys into 10k slots keeps standard-mode overflow inside
        // the 1400-slot cellar.
        c.bench_function(&format!("coalesced_insert_5k_{}", name), |b| {
            b.iter_batched(
                || CoalescedHashMap::<u64, u64>::with_mode(10_000, mode).unwrap(),
                |mut m| {
                    for (i, x) in lcg(3).take(5_000).enumerate() {
                        black_box(m.insert(x, i as u64));
                    }
                    m
                },
                BatchSize::SmallInput,
            )
        });
    }
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("coalesced_get_hit", |b| {
        let mut m = CoalescedHashMap::<u64, u64>::new(10_000).unwrap();
        let keys: Vec<u64> = lcg(7).take(10_000).collect();
        for (i, &k) in keys.iter().enumerate() {
            m.insert(k, i as u64);
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            let v = m.get(k).unwrap();
            black_box(v);
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("coalesced_get_miss", |b| {
        let mut m = CoalescedHashMap::<u64, u64>::new(10_000).unwrap();
        for (i, x) in lcg(11).take(10_000).enumerate() {
            m.insert(x, i as u64);
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // generate keys unlikely in map
            let k = miss.next().unwrap();
            black_box(m.get(&k));
        })
    });
}

fn bench_iter(c: &mut Criterion) {
    c.bench_function("coalesced_iter_10k", |b| {
        let mut m = CoalescedHashMap::<u64, u64>::new(10_000).unwrap();
        for (i, x) in lcg(13).take(10_000).enumerate() {
            m.insert(x, i as u64);
        }
        b.iter(|| {
            let mut acc = 0u64;
            for (_, &v) in &m {
                acc = acc.wrapping_add(v);
            }
            black_box(acc)
        })
    });
}

// Growable-table baselines for the same workload.
fn bench_baselines(c: &mut Criterion) {
    c.bench_function("std_hashmap_insert_10k", |b| {
        b.iter_batched(
            || std::collections::HashMap::<u64, u64>::with_capacity(10_000),
            |mut m| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    black_box(m.insert(x, i as u64));
                }
                m
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("hashbrown_insert_10k", |b| {
        b.iter_batched(
            || hashbrown::HashMap::<u64, u64>::with_capacity(10_000),
            |mut m| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    black_box(m.insert(x, i as u64));
                }
                m
            },
            BatchSize::SmallInput,
        )
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
    targets = bench_insert, bench_insert_modes, bench_get_hit, bench_get_miss, bench_iter, bench_baselines
}
criterion_main!(benches);
