//! Relax a random matrix on the GPU and check it against the CPU
//!
//! Run with: `cargo run --example gpu_relax --features gpu`

use trueno_apsp::{
    floyd_warshall, gpu_floyd_warshall, random_positive, GpuDevice, LaunchConfig,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let device = match GpuDevice::new().await {
        Ok(device) => device,
        Err(e) => {
            eprintln!("⚠️  GPU not available: {e}");
            return Ok(());
        }
    };
    let info = device.info();
    println!("🖥️  {} ({:?})", info.name, info.backend);

    let seed = random_positive::<f32>(4, 7);
    println!("Initial Matrix:\n{seed}");

    let mut matrix = seed.clone();
    let report = gpu_floyd_warshall(&device, &mut matrix, &LaunchConfig::default()).await?;
    println!("Final Matrix:\n{matrix}");

    println!(
        "{} launches × {} lanes in {:?}; matches CPU: {}",
        report.launches,
        report.lanes,
        report.elapsed,
        matrix == floyd_warshall(&seed)
    );
    Ok(())
}
