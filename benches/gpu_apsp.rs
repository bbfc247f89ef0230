//! GPU benchmarks: wgpu relaxation vs the CPU reference
//!
//! Requires the `gpu` feature. Skips when no adapter is present.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use trueno_apsp::{floyd_warshall, gpu_floyd_warshall, random_positive, GpuDevice, LaunchConfig};

/// Benchmark: GPU relaxation vs CPU relaxation
fn bench_gpu_relaxation(c: &mut Criterion) {
    // Try to create GPU device; skip if unavailable
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let device = match runtime.block_on(GpuDevice::new()) {
        Ok(dev) => dev,
        Err(_) => {
            eprintln!("⚠️  GPU not available - skipping GPU relaxation benchmarks");
            return;
        }
    };

    let mut group = c.benchmark_group("relaxation_comparison");

    for size in [32, 64, 128] {
        let seed = random_positive::<f32>(size, 42);

        group.bench_with_input(BenchmarkId::new("cpu", size), &seed, |b, seed| {
            b.iter(|| black_box(floyd_warshall(black_box(seed))));
        });

        let lanes = device.max_lanes().min(64);
        group.bench_with_input(BenchmarkId::new("gpu", size), &seed, |b, seed| {
            b.iter(|| {
                runtime.block_on(async {
                    let mut m = seed.clone();
                    gpu_floyd_warshall(&device, &mut m, &LaunchConfig::with_lanes(lanes))
                        .await
                        .unwrap();
                    black_box(m);
                });
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_gpu_relaxation);
criterion_main!(benches);
