//! Distributed substrate: cooperating execution units
//!
//! SPMD over OS threads. Each unit owns a private replica of the weight
//! matrix and talks to the others only through collectives.
//!
//! # Architecture
//!
//! - `comm`: world and subgroup communicators (broadcast, min all-reduce)
//! - `topology`: even/odd communication domains
//! - `band`: static row ownership
//! - `pivot`: initial replica broadcast and per-iteration pivot row
//! - `reduce`: per-iteration global minimum reduction
//! - `unit`: the per-unit relaxation loop
//! - `launcher`: spawning units and collecting the result

pub mod band;
pub mod comm;
pub mod launcher;
pub mod pivot;
pub mod reduce;
pub mod topology;
pub mod unit;

pub use band::{band_for, row_owner, Band, BandSplit};
pub use comm::{world, world_with_abort, AbortHandle, CommError, Communicator, Rank};
pub use launcher::{run_cluster, ClusterConfig, ClusterError, ClusterRun, DEFAULT_UNITS};
pub use pivot::{PivotScope, ROOT};
pub use topology::{
    partition_by_parity, CommunicationDomain, Parity, Topology, TopologyError, UnitGroup,
    MIN_UNITS,
};
pub use unit::{run_unit, UnitOutcome};
