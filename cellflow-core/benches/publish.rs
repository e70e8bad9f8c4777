//! Publish-cycle benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cellflow_core::{Batch, Cell, Engine, Stream};

fn bench_diamond(c: &mut Criterion) {
    let mut group = c.benchmark_group("diamond");

    for depth in [4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let root = Stream::<u64>::new();
            let mut engine = Engine::new();
            let mut tip = engine.map(&root, |n| *n);
            for _ in 0..depth {
                let left = engine.map(&tip, |n| n + 1);
                let right = engine.map(&tip, |n| n * 2);
                let joined = engine.combine((left, right));
                tip = engine.map(&joined, |(l, r)| l + r);
            }

            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                black_box(engine.publish(&root, n)).ok();
            });
        });
    }

    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for width in [16usize, 256, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let root = Cell::new(0u64);
            let mut engine = Engine::new();
            for _ in 0..width {
                let _ = engine.map(&root, |n| n % 7);
            }

            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                black_box(engine.publish(&root, n)).ok();
            });
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let cells: Vec<Cell<u64>> = (0..32).map(|_| Cell::new(0)).collect();
    let mut engine = Engine::new();
    for pair in cells.chunks(2) {
        let _ = engine.combine((pair[0], pair[1]));
    }

    let mut n = 0u64;
    c.bench_function("batch_32_roots", |b| {
        b.iter(|| {
            n += 1;
            let batch = cells
                .iter()
                .fold(Batch::new(), |batch, cell| batch.with(cell, n));
            black_box(engine.publish_in(batch)).ok();
        });
    });
}

criterion_group!(benches, bench_diamond, bench_fan_out, bench_batch);
criterion_main!(benches);
