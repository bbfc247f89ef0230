//! trueno-apsp: all-pairs shortest paths on cooperating substrates
//!
//! # Overview
//!
//! trueno-apsp computes all-pairs shortest path distances over a dense weight
//! matrix with Floyd–Warshall min-plus relaxation. The same relaxation runs on
//! three substrates that must agree with the sequential reference:
//!
//! - **Reference**: single-threaded relaxation in [`algorithms`]
//! - **Cluster**: units partitioned into even/odd communication domains,
//!   each relaxing a band of rows and reconciling through a global minimum
//!   reduction ([`cluster`])
//! - **Device**: lane-parallel barrier phases, one launch per pivot
//!   ([`device`], with a wgpu backend in `gpu`)
//!
//! # Quick Start
//!
//! ```
//! use trueno_apsp::{floyd_warshall, reference_fixture, run_cluster, ClusterConfig};
//!
//! let seed = reference_fixture::<i32>();
//! let run = run_cluster(&seed, &ClusterConfig::with_units(4)).unwrap();
//!
//! assert!(run.replicas_consistent());
//! assert_eq!(run.result, floyd_warshall(&seed));
//! ```
//!
//! # Architecture
//!
//! - **Matrix**: dense row-major storage generic over [`Weight`]
//! - **Collectives**: in-process broadcast and min all-reduce over threads
//! - **Bands**: static row ownership per domain or per unit
//! - **Device**: staged column/row buffers behind a per-phase barrier

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithms;
pub mod cluster;
pub mod device;
pub mod matrix;

// GPU backend (optional)
#[cfg(feature = "gpu")]
pub mod gpu;

// Re-export core types
pub use algorithms::{
    floyd_warshall, floyd_warshall_in_place, relax_band, relax_pivot, relaxation_history,
};
pub use cluster::{run_cluster, BandSplit, ClusterConfig, ClusterError, ClusterRun, PivotScope};
pub use device::{emulated_floyd_warshall, DeviceError, DeviceRunReport, LaunchConfig};
pub use matrix::{random_positive, reference_fixture, MatrixError, Weight, WeightMatrix};

#[cfg(feature = "gpu")]
pub use gpu::{gpu_floyd_warshall, GpuDevice};

// Error type
pub use anyhow::{Error, Result};
