//! Pivot propagation
//!
//! The initial matrix is broadcast once over the world. After that, row `k`
//! is re-broadcast every iteration before relaxation.
//!
//! With [`PivotScope::IntraDomain`] (the default) row `k` travels only inside
//! each unit's own domain, sourced from the domain's first member, which is
//! not necessarily the unit that relaxed row `k`. Every replica is already
//! identical after the previous reduction, so this broadcast cannot change
//! the result; it also does not carry row `k` across domains on its own.
//! Correctness rests on the reduction in [`super::reduce`].
//! [`PivotScope::Global`] broadcasts row `k` from its band owner over the
//! world instead. It gives the same matrix and is kept as an explicit,
//! opt-in alternative.

use super::band::{row_owner, BandSplit};
use super::comm::{CommError, Communicator, Rank};
use super::topology::Topology;
use crate::matrix::{Weight, WeightMatrix};
use tracing::trace;

/// Unit that seeds the initial replica and reports the result
pub const ROOT: Rank = 0;

/// Domain rank that sources the intra-domain pivot broadcast
pub const DOMAIN_REPRESENTATIVE: Rank = 0;

/// Where the per-iteration pivot row comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PivotScope {
    /// Broadcast row `k` within each domain from its representative
    #[default]
    IntraDomain,

    /// Broadcast row `k` over the world from the unit whose band holds it
    Global,
}

/// Establish the shared initial replica: `matrix` on [`ROOT`] overwrites
/// every other unit's `matrix`
///
/// # Errors
///
/// Returns `CommError::LengthMismatch` if replica sizes differ
pub fn broadcast_initial<W: Weight>(
    world: &Communicator<W>,
    matrix: &mut WeightMatrix<W>,
) -> Result<(), CommError> {
    world.broadcast(matrix.as_mut_slice(), ROOT)
}

/// Fill `pivot` with a fresh copy of row `k`
///
/// `pivot` is first loaded from the local replica, then overwritten by the
/// scoped broadcast.
///
/// # Errors
///
/// Propagates collective errors
pub fn propagate_pivot<W: Weight>(
    scope: PivotScope,
    topology: &Topology<W>,
    world: &Communicator<W>,
    split: BandSplit,
    matrix: &WeightMatrix<W>,
    k: usize,
    pivot: &mut Vec<W>,
) -> Result<(), CommError> {
    pivot.clear();
    pivot.extend_from_slice(matrix.row(k));

    match scope {
        PivotScope::IntraDomain => {
            for domain in topology.domains() {
                if let Some(comm) = domain.handle() {
                    comm.broadcast(pivot, DOMAIN_REPRESENTATIVE)?;
                    trace!(rank = world.rank(), k, domain = comm.label(), "pivot row");
                }
            }
        }
        PivotScope::Global => {
            let owner = row_owner(split, matrix.size(), world.size(), k).unwrap_or(ROOT);
            world.broadcast(pivot, owner)?;
            trace!(rank = world.rank(), k, owner, "pivot row (global)");
        }
    }
    Ok(())
}
