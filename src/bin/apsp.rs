//! `apsp` - all-pairs shortest paths on the cluster or device substrate
//!
//! ```bash
//! apsp cluster --units 4
//! apsp device --size 4 --lanes 4
//! TRUENO_APSP_UNITS=6 apsp cluster --band-split per-unit
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trueno_apsp::cluster::MIN_UNITS;
use trueno_apsp::device::DEFAULT_LANES;
use trueno_apsp::{
    emulated_floyd_warshall, random_positive, reference_fixture, run_cluster, BandSplit,
    ClusterConfig, ClusterError, LaunchConfig, PivotScope, WeightMatrix,
};

/// All-pairs shortest paths by min-plus relaxation
#[derive(Parser, Debug)]
#[command(name = "apsp")]
#[command(about = "All-pairs shortest paths on cooperating units or a lane-parallel device")]
#[command(version)]
struct Cli {
    /// Log filter (overrides `RUST_LOG`), e.g. `debug` or `trueno_apsp=trace`
    #[arg(short, long, global = true, env = "TRUENO_APSP_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Relax across even/odd unit domains
    Cluster(ClusterArgs),
    /// Relax with lane-parallel launches
    Device(DeviceArgs),
}

#[derive(clap::Args, Debug)]
struct ClusterArgs {
    /// Number of execution units
    #[arg(
        short,
        long,
        env = "TRUENO_APSP_UNITS",
        default_value_t = trueno_apsp::cluster::DEFAULT_UNITS
    )]
    units: usize,

    /// Row assignment within each domain
    #[arg(
        long,
        value_enum,
        env = "TRUENO_APSP_BAND_SPLIT",
        default_value_t = BandSplitArg::DomainHalves
    )]
    band_split: BandSplitArg,

    /// Pivot row broadcast topology
    #[arg(
        long,
        value_enum,
        env = "TRUENO_APSP_PIVOT_SCOPE",
        default_value_t = PivotScopeArg::IntraDomain
    )]
    pivot_scope: PivotScopeArg,

    /// Random matrix dimension (default: the 8×8 reference fixture)
    #[arg(short, long)]
    size: Option<usize>,

    /// Random matrix seed
    #[arg(long, env = "TRUENO_APSP_SEED", default_value_t = 1)]
    seed: u64,
}

#[derive(clap::Args, Debug)]
struct DeviceArgs {
    /// Matrix dimension
    #[arg(short, long, default_value_t = 4)]
    size: usize,

    /// Lanes per launch
    #[arg(long, env = "TRUENO_APSP_LANES", default_value_t = DEFAULT_LANES)]
    lanes: usize,

    /// Random matrix seed
    #[arg(long, env = "TRUENO_APSP_SEED", default_value_t = 1)]
    seed: u64,

    /// Execution backend
    #[arg(long, value_enum, env = "TRUENO_APSP_BACKEND", default_value_t = BackendArg::Emulated)]
    backend: BackendArg,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BandSplitArg {
    DomainHalves,
    PerUnit,
}

impl From<BandSplitArg> for BandSplit {
    fn from(arg: BandSplitArg) -> Self {
        match arg {
            BandSplitArg::DomainHalves => Self::DomainHalves,
            BandSplitArg::PerUnit => Self::PerUnit,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PivotScopeArg {
    IntraDomain,
    Global,
}

impl From<PivotScopeArg> for PivotScope {
    fn from(arg: PivotScopeArg) -> Self {
        match arg {
            PivotScopeArg::IntraDomain => Self::IntraDomain,
            PivotScopeArg::Global => Self::Global,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Emulated,
    Gpu,
}

fn init_tracing(level: Option<&str>) {
    let filter = level
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_cluster_command(args: &ClusterArgs) -> Result<()> {
    let seed: WeightMatrix<i32> = match args.size {
        Some(n) => random_positive(n, args.seed),
        None => reference_fixture(),
    };
    let config = ClusterConfig::with_units(args.units)
        .band_split(args.band_split.into())
        .pivot_scope(args.pivot_scope.into());

    let run = match run_cluster(&seed, &config) {
        Ok(run) => run,
        Err(ClusterError::InsufficientUnits { found }) => {
            info!(found, required = MIN_UNITS, "nothing to do");
            println!("Please run this program with at least {MIN_UNITS} processes.");
            return Ok(());
        }
        Err(err) => return Err(err).context("cluster run failed"),
    };

    print!("Initial Matrix \n\n{}", run.initial);
    print!("\nMatrix After Processing\n\n{}", run.result);
    info!(units = args.units, elapsed = ?run.elapsed, "cluster command complete");
    Ok(())
}

#[cfg(feature = "gpu")]
fn relax_on_gpu(matrix: &mut WeightMatrix<f32>, config: &LaunchConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    runtime.block_on(async {
        let device = trueno_apsp::GpuDevice::new().await?;
        trueno_apsp::gpu_floyd_warshall(&device, matrix, config).await?;
        Ok(())
    })
}

#[cfg(not(feature = "gpu"))]
fn relax_on_gpu(_matrix: &mut WeightMatrix<f32>, _config: &LaunchConfig) -> Result<()> {
    bail!("the gpu backend requires building with `--features gpu`")
}

fn run_device_command(args: &DeviceArgs) -> Result<()> {
    if args.lanes == 0 {
        bail!("--lanes must be at least 1");
    }
    let config = LaunchConfig::with_lanes(args.lanes);
    let mut matrix: WeightMatrix<f32> = random_positive(args.size, args.seed);

    println!("Initial Matrix:\n{matrix}");
    match args.backend {
        BackendArg::Emulated => {
            emulated_floyd_warshall(&mut matrix, &config)?;
        }
        BackendArg::Gpu => relax_on_gpu(&mut matrix, &config)?,
    }
    println!("Final Matrix:\n{matrix}");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match &cli.command {
        Command::Cluster(args) => run_cluster_command(args),
        Command::Device(args) => run_device_command(args),
    }
}
