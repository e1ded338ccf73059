//! Benchmarks for handle-based matrix assembly.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use spicemos_core::{NodeId, SparseMatrix};

fn bench_stamp_ladder(c: &mut Criterion) {
    let mut group = c.benchmark_group("stamp_ladder");

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bencher, &size| {
            let mut m = SparseMatrix::new();
            let mut handles = Vec::new();
            for i in 1..=size as u32 {
                let a = NodeId::new(i);
                let b = NodeId::new(i + 1);
                handles.push([m.element(a, a), m.element(a, b), m.element(b, a), m.element(b, b)]);
            }

            bencher.iter(|| {
                m.clear();
                for h in &handles {
                    m.add(h[0], black_box(1e-3));
                    m.add(h[1], black_box(-1e-3));
                    m.add(h[2], black_box(-1e-3));
                    m.add(h[3], black_box(1e-3));
                }
            });
        });
    }

    group.finish();
}

fn bench_to_dense(c: &mut Criterion) {
    let mut m = SparseMatrix::new();
    for i in 1..=200u32 {
        let h = m.element(NodeId::new(i), NodeId::new(i));
        m.add(h, 1.0);
    }
    c.bench_function("to_dense_200", |b| b.iter(|| m.to_dense(black_box(200))));
}

criterion_group!(benches, bench_stamp_ladder, bench_to_dense);
criterion_main!(benches);
