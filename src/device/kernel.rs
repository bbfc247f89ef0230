//! Lane-parallel relaxation kernel
//!
//! One launch applies one pivot. Inside a launch, `lanes` threads share the
//! device matrix and the staging vectors:
//!
//! ```text
//! lane t:  column[i] = D[i][k]   for i = t, t+L, t+2L, ...
//!          ── barrier ──
//!          row[j]    = D[k][j]   for j = t, t+L, ...
//!          ── barrier ──
//!          D[i][j] = min(D[i][j], column[i] + row[j])   for i = t, t+L, ...
//! ```
//!
//! Each staging index and each matrix row is written by exactly one lane.
//! Launches run strictly one after another; returning from
//! [`launch_relaxation`] is the host/device synchronization point.

use super::memory::{with_device_matrix, DeviceMatrix, DeviceScalar, StagingBuffers};
use crate::matrix::WeightMatrix;
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Default lanes per launch
pub const DEFAULT_LANES: usize = 4;

/// Device launch errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// Launch configuration cannot run
    #[error("invalid launch configuration: {0}")]
    InvalidLaunch(String),
}

/// Kernel launch shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Concurrent lanes sharing one barrier
    pub lanes: usize,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES,
        }
    }
}

impl LaunchConfig {
    /// Launch with `lanes` lanes
    #[must_use]
    pub const fn with_lanes(lanes: usize) -> Self {
        Self { lanes }
    }

    /// Check the shape is runnable
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::InvalidLaunch` for zero lanes
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.lanes == 0 {
            return Err(DeviceError::InvalidLaunch(
                "at least one lane is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary of a device run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRunReport {
    /// Kernel launches issued (one per pivot)
    pub launches: usize,
    /// Lanes per launch
    pub lanes: usize,
    /// Wall time including transfers
    pub elapsed: Duration,
}

fn relax_lane<W: DeviceScalar>(
    matrix: &DeviceMatrix<W>,
    staging: &StagingBuffers<W>,
    k: usize,
    lane: usize,
    lanes: usize,
    barrier: &Barrier,
) {
    let n = matrix.size();

    for i in (lane..n).step_by(lanes) {
        staging.set_column(i, matrix.load(i, k));
    }
    barrier.wait();

    for j in (lane..n).step_by(lanes) {
        staging.set_row(j, matrix.load(k, j));
    }
    barrier.wait();

    for i in (lane..n).step_by(lanes) {
        let via_k = staging.column(i);
        for j in 0..n {
            let current = matrix.load(i, j);
            matrix.store(i, j, current.min_weight(via_k.path_sum(staging.row(j))));
        }
    }
}

/// Launch one relaxation phase for pivot `k` and wait for it to finish
///
/// # Errors
///
/// Returns `DeviceError::InvalidLaunch` for zero lanes or `k` out of range
pub fn launch_relaxation<W: DeviceScalar>(
    matrix: &DeviceMatrix<W>,
    staging: &StagingBuffers<W>,
    k: usize,
    config: &LaunchConfig,
) -> Result<(), DeviceError> {
    config.validate()?;
    if k >= matrix.size() {
        return Err(DeviceError::InvalidLaunch(format!(
            "pivot {k} out of range for size {}",
            matrix.size()
        )));
    }

    let lanes = config.lanes;
    let barrier = Barrier::new(lanes);
    thread::scope(|scope| {
        for lane in 0..lanes {
            let barrier = &barrier;
            scope.spawn(move || relax_lane(matrix, staging, k, lane, lanes, barrier));
        }
    });
    trace!(k, lanes, "launch complete");
    Ok(())
}

/// Relax `host` in place with `n` sequential launches
///
/// # Errors
///
/// Returns `DeviceError::InvalidLaunch` for an unrunnable launch shape
///
/// # Example
///
/// ```
/// use trueno_apsp::device::{emulated_floyd_warshall, LaunchConfig};
/// use trueno_apsp::{floyd_warshall, random_positive};
///
/// let seed = random_positive::<f32>(6, 42);
/// let mut relaxed = seed.clone();
/// let report = emulated_floyd_warshall(&mut relaxed, &LaunchConfig::with_lanes(3)).unwrap();
///
/// assert_eq!(report.launches, 6);
/// assert_eq!(relaxed, floyd_warshall(&seed));
/// ```
pub fn emulated_floyd_warshall<W: DeviceScalar>(
    host: &mut WeightMatrix<W>,
    config: &LaunchConfig,
) -> Result<DeviceRunReport, DeviceError> {
    config.validate()?;
    let n = host.size();
    info!(n, lanes = config.lanes, "starting device run");
    let started = Instant::now();

    with_device_matrix(host, |matrix| {
        let staging = StagingBuffers::new(n);
        for k in 0..n {
            launch_relaxation(matrix, &staging, k, config)?;
            debug!(k, "pivot relaxed");
        }
        Ok::<(), DeviceError>(())
    })?;

    let elapsed = started.elapsed();
    info!(n, ?elapsed, "device run complete");
    Ok(DeviceRunReport {
        launches: n,
        lanes: config.lanes,
        elapsed,
    })
}
