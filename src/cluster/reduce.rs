//! Global consistency reduction
//!
//! One blocking element-wise minimum over the whole matrix per iteration.
//! When it returns, every unit holds the same replica and iteration `k + 1`
//! may begin; no unit can get ahead, since the call is a barrier.

use super::comm::{CommError, Communicator};
use crate::matrix::{Weight, WeightMatrix};

/// Republish the per-cell minimum over every unit's replica
///
/// # Errors
///
/// Returns `CommError::LengthMismatch` if replica sizes differ
pub fn synchronize_iteration<W: Weight>(
    world: &Communicator<W>,
    matrix: &mut WeightMatrix<W>,
) -> Result<(), CommError> {
    world.all_reduce_min(matrix.as_mut_slice())
}
