//! Document diff benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use docflow_bench::{generate_documents, perturb, random_document};
use docflow_document::{diff, is_noop, DiffOptions};

/// Benchmark diffing documents of growing width.
fn bench_diff_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_width");
    let options = DiffOptions::default();

    for fields in [8, 64, 512].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(fields), fields, |b, &fields| {
            let old = random_document(0, fields, 16);
            let new = perturb(&old, fields / 4);

            b.iter(|| {
                let result = diff(black_box(&old), black_box(&new), &options);
                black_box(result);
            });
        });
    }
    group.finish();
}

/// Benchmark the vector tolerance check against vector size.
fn bench_diff_vector(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_vector");
    let options = DiffOptions::default();

    for dimension in [16, 384, 1536].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(dimension),
            dimension,
            |b, &dimension| {
                let old = random_document(0, 4, dimension);
                let new = perturb(&old, 0);

                b.iter(|| {
                    let result = diff(black_box(&old), black_box(&new), &options);
                    black_box(is_noop(&result));
                });
            },
        );
    }
    group.finish();
}

/// Benchmark diffing a whole chunk.
fn bench_diff_chunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_chunk");
    let options = DiffOptions::default();

    for count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let old = generate_documents(count, 16, 32);
            let new: Vec<_> = old.iter().map(|d| perturb(d, 2)).collect();

            b.iter(|| {
                let changed = old
                    .iter()
                    .zip(&new)
                    .map(|(o, n)| diff(o, n, &options))
                    .filter(|d| !is_noop(d))
                    .count();
                black_box(changed);
            });
        });
    }
    group.finish();
}

/// Benchmark leaf path enumeration.
fn bench_keys(c: &mut Criterion) {
    c.bench_function("keys", |b| {
        let document = random_document(0, 64, 16);

        b.iter(|| {
            let result = black_box(&document).keys();
            black_box(result);
        });
    });
}

criterion_group!(
    benches,
    bench_diff_width,
    bench_diff_vector,
    bench_diff_chunk,
    bench_keys,
);

criterion_main!(benches);
