//! Run the reference fixture on every CPU substrate
//!
//! Showcases:
//! - Sequential Floyd–Warshall reference
//! - Cluster units in even/odd domains, both band splits
//! - Emulated lane-parallel device launches
//!
//! Run with: `cargo run --example substrates`

use trueno_apsp::cluster::band_for;
use trueno_apsp::{
    emulated_floyd_warshall, floyd_warshall, reference_fixture, run_cluster, BandSplit,
    ClusterConfig, LaunchConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        trueno-apsp Substrate Demo                           ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let seed = reference_fixture::<i32>();
    println!("Initial Matrix\n\n{seed}");

    // ═══════════════════════════════════════════════════════════════
    // Reference
    // ═══════════════════════════════════════════════════════════════
    let reference = floyd_warshall(&seed);
    println!("📊 Sequential reference\n\n{reference}");

    // ═══════════════════════════════════════════════════════════════
    // Cluster
    // ═══════════════════════════════════════════════════════════════
    for (name, split) in [
        ("domain halves", BandSplit::DomainHalves),
        ("per unit", BandSplit::PerUnit),
    ] {
        let config = ClusterConfig::with_units(4).band_split(split);
        let run = run_cluster(&seed, &config)?;
        println!("🔗 Cluster, 4 units, {name} ({:?})", run.elapsed);
        for rank in 0..config.units {
            let band = band_for(split, seed.size(), config.units, rank);
            println!("   unit {rank}: rows {:?}", band.rows());
        }
        println!(
            "   replicas consistent: {}, matches reference: {}\n",
            run.replicas_consistent(),
            run.result == reference
        );
    }

    // ═══════════════════════════════════════════════════════════════
    // Device
    // ═══════════════════════════════════════════════════════════════
    let mut device = reference_fixture::<f32>();
    let report = emulated_floyd_warshall(&mut device, &LaunchConfig::default())?;
    println!(
        "⚡ Emulated device: {} launches × {} lanes ({:?})",
        report.launches, report.lanes, report.elapsed
    );
    println!("   matches reference: {}", device == reference.map(|w| w as f32));

    Ok(())
}
