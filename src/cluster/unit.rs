//! The SPMD program every execution unit runs
//!
//! ```text
//! build topology ─► broadcast initial replica ─► for k in 0..n:
//!     propagate pivot row k ─► relax own band ─► global min-reduce
//! ```
//!
//! All units walk this loop in lockstep; each collective is a barrier.

use super::band::{band_for, Band};
use super::comm::{Communicator, Rank};
use super::launcher::{ClusterConfig, ClusterError};
use super::pivot::{broadcast_initial, propagate_pivot, ROOT};
use super::reduce::synchronize_iteration;
use super::topology::Topology;
use crate::algorithms::relax_band;
use crate::matrix::{Weight, WeightMatrix};
use tracing::debug;

/// What one unit ends the run with
#[derive(Debug, Clone)]
pub struct UnitOutcome<W> {
    /// World rank
    pub rank: Rank,
    /// Rows this unit relaxed
    pub band: Band,
    /// Replica after the initial broadcast
    pub initial: WeightMatrix<W>,
    /// Replica after the last reduction
    pub result: WeightMatrix<W>,
    /// Replica after every reduction (reporting unit only, when enabled)
    pub history: Vec<WeightMatrix<W>>,
}

/// Run the relaxation loop on one unit
///
/// `seed` is only read on [`ROOT`]; other units receive it by broadcast and
/// may pass `None`. `n` must be the same on every unit.
///
/// # Errors
///
/// - `ClusterError::InsufficientUnits` if the world has fewer than two units
/// - `ClusterError::Comm` if a collective fails
pub fn run_unit<W: Weight>(
    mut world: Communicator<W>,
    seed: Option<WeightMatrix<W>>,
    n: usize,
    config: &ClusterConfig,
) -> Result<UnitOutcome<W>, ClusterError> {
    let topology = Topology::build(&mut world)?;
    let rank = world.rank();
    let band = band_for(config.band_split, n, world.size(), rank);

    let mut initial = match seed {
        Some(matrix) if rank == ROOT => matrix,
        _ => WeightMatrix::zeroed(n),
    };
    broadcast_initial(&world, &mut initial)?;

    let mut result = initial.clone();
    let mut pivot = Vec::with_capacity(n);
    let mut history = Vec::new();

    for k in 0..n {
        propagate_pivot(
            config.pivot_scope,
            &topology,
            &world,
            config.band_split,
            &result,
            k,
            &mut pivot,
        )?;
        relax_band(&mut result, band.rows(), k, &pivot);
        synchronize_iteration(&world, &mut result)?;

        if config.record_history && rank == ROOT {
            history.push(result.clone());
        }
        debug!(rank, k, band_start = band.start(), band_end = band.end(), "iteration complete");
    }

    topology.release();
    Ok(UnitOutcome {
        rank,
        band,
        initial,
        result,
        history,
    })
}
