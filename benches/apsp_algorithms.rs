//! Criterion benchmarks for the CPU substrates
//!
//! Compares the sequential reference against the cluster (both band splits)
//! and the emulated device on the same seeded matrices.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use trueno_apsp::{
    emulated_floyd_warshall, floyd_warshall, random_positive, run_cluster, BandSplit,
    ClusterConfig, LaunchConfig, WeightMatrix,
};

const SIZES: [usize; 3] = [16, 32, 64];

/// Benchmark: sequential reference
fn bench_reference(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference");

    for size in SIZES {
        let seed: WeightMatrix<f32> = random_positive(size, 42);
        group.bench_with_input(BenchmarkId::new("floyd_warshall", size), &seed, |b, seed| {
            b.iter(|| black_box(floyd_warshall(black_box(seed))));
        });
    }

    group.finish();
}

/// Benchmark: cluster runs with four units
fn bench_cluster(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster");

    for size in SIZES {
        let seed: WeightMatrix<f32> = random_positive(size, 42);
        for (name, split) in [
            ("domain_halves", BandSplit::DomainHalves),
            ("per_unit", BandSplit::PerUnit),
        ] {
            let config = ClusterConfig::with_units(4).band_split(split);
            group.bench_with_input(BenchmarkId::new(name, size), &seed, |b, seed| {
                b.iter(|| {
                    let run = run_cluster(black_box(seed), &config).unwrap();
                    black_box(run.result);
                });
            });
        }
    }

    group.finish();
}

/// Benchmark: emulated device launches
fn bench_device(c: &mut Criterion) {
    let mut group = c.benchmark_group("device");

    for size in SIZES {
        let seed: WeightMatrix<f32> = random_positive(size, 42);
        for lanes in [4, 8] {
            group.bench_with_input(
                BenchmarkId::new(format!("lanes_{lanes}"), size),
                &seed,
                |b, seed| {
                    b.iter(|| {
                        let mut m = seed.clone();
                        emulated_floyd_warshall(&mut m, &LaunchConfig::with_lanes(lanes)).unwrap();
                        black_box(m);
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_reference, bench_cluster, bench_device);
criterion_main!(benches);
