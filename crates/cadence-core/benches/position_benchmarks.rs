use cadence_core::position::{self, Between};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_append_chain(c: &mut Criterion) {
    c.bench_function("append_chain_1000", |b| {
        b.iter(|| {
            let mut key = position::min();
            for _ in 0..1000 {
                key = position::next(black_box(&key));
            }
            key
        })
    });
}

fn bench_between_neighbours(c: &mut Criterion) {
    let keys = position::spread(1000);

    c.bench_function("between_spread_neighbours", |b| {
        b.iter(|| {
            for pair in keys.windows(2) {
                black_box(position::between(&pair[0], &pair[1]));
            }
        })
    });
}

fn bench_narrowing_inserts(c: &mut Criterion) {
    // Always insert right after the same key until the gap is exhausted.
    c.bench_function("between_until_rebalance", |b| {
        b.iter(|| {
            let lower = "1".to_string();
            let mut upper = "2".to_string();
            let mut inserts = 0;
            while let Between::Key(key) = position::between(&lower, &upper) {
                upper = key;
                inserts += 1;
            }
            black_box(inserts)
        })
    });
}

fn bench_spread(c: &mut Criterion) {
    let mut group = c.benchmark_group("spread");
    for size in [10usize, 100, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| position::spread(black_box(size)))
        });
    }
    group.finish();
}

fn bench_max_key(c: &mut Criterion) {
    let mut keys = position::spread(5000);
    for i in 0..keys.len() / 10 {
        let idx = fastrand::usize(..keys.len());
        keys[idx] = format!("{}.0", i);
    }

    c.bench_function("max_key_with_legacy_entries", |b| {
        b.iter(|| position::max_key(black_box(keys.iter().map(String::as_str))))
    });
}

criterion_group!(
    benches,
    bench_append_chain,
    bench_between_neighbours,
    bench_narrowing_inserts,
    bench_spread,
    bench_max_key
);
criterion_main!(benches);
