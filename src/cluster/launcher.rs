//! Cluster launcher
//!
//! Spawns one thread per execution unit, hands each its world handle, runs
//! [`run_unit`] everywhere and collects the reporting unit's view.
//!
//! Units park on a start gate until every thread exists, so a failed spawn
//! never leaves the others waiting on a world barrier sized for all of
//! them. Once running, a unit that panics or fails aborts the world, which
//! releases every peer blocked in a collective.

use super::band::{Band, BandSplit};
use super::comm::{world_with_abort, AbortHandle, CommError, Rank};
use super::pivot::{PivotScope, ROOT};
use super::topology::{TopologyError, MIN_UNITS};
use super::unit::{run_unit, UnitOutcome};
use crate::matrix::{Weight, WeightMatrix};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Default number of execution units
pub const DEFAULT_UNITS: usize = 4;

/// Cluster run errors
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Fewer than two units: a configuration error, not a runtime failure
    #[error("need at least {MIN_UNITS} execution units, found {found}")]
    InsufficientUnits {
        /// Requested unit count
        found: usize,
    },

    /// A collective call failed
    #[error(transparent)]
    Comm(#[from] CommError),

    /// An execution unit thread could not be started
    #[error("failed to spawn execution unit {rank}: {source}")]
    Spawn {
        /// Rank of the unit
        rank: Rank,
        /// OS error
        #[source]
        source: std::io::Error,
    },

    /// An execution unit panicked
    #[error("execution unit {rank} panicked")]
    UnitPanicked {
        /// Rank of the unit
        rank: Rank,
    },

    /// The unit never started, or stopped, because another unit failed
    #[error("execution unit {rank} stopped: the run was aborted")]
    Aborted {
        /// Rank of the unit
        rank: Rank,
    },

    /// The reporting unit produced no result
    #[error("reporting unit {rank} returned no result")]
    MissingReport {
        /// Rank of the reporting unit
        rank: Rank,
    },
}

impl ClusterError {
    /// Whether this error only reflects another unit's failure
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. } | Self::Comm(CommError::Aborted))
    }
}

impl From<TopologyError> for ClusterError {
    fn from(err: TopologyError) -> Self {
        match err {
            TopologyError::InsufficientUnits { found } => Self::InsufficientUnits { found },
            TopologyError::Comm(err) => Self::Comm(err),
        }
    }
}

/// Cluster run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Number of execution units
    pub units: usize,
    /// Row assignment
    pub band_split: BandSplit,
    /// Pivot row broadcast topology
    pub pivot_scope: PivotScope,
    /// Keep the reporting unit's replica after every iteration
    pub record_history: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            units: DEFAULT_UNITS,
            band_split: BandSplit::default(),
            pivot_scope: PivotScope::default(),
            record_history: false,
        }
    }
}

impl ClusterConfig {
    /// Default configuration with `units` execution units
    #[must_use]
    pub fn with_units(units: usize) -> Self {
        Self {
            units,
            ..Self::default()
        }
    }

    /// Set the row assignment
    #[must_use]
    pub const fn band_split(mut self, split: BandSplit) -> Self {
        self.band_split = split;
        self
    }

    /// Set the pivot broadcast topology
    #[must_use]
    pub const fn pivot_scope(mut self, scope: PivotScope) -> Self {
        self.pivot_scope = scope;
        self
    }

    /// Record per-iteration snapshots
    #[must_use]
    pub const fn record_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }
}

/// Result of a cluster run
#[derive(Debug, Clone)]
pub struct ClusterRun<W> {
    /// Initial replica as seen by the reporting unit
    pub initial: WeightMatrix<W>,
    /// Final replica of the reporting unit
    pub result: WeightMatrix<W>,
    /// Final replica of every unit, in rank order
    pub replicas: Vec<WeightMatrix<W>>,
    /// Band of every unit, in rank order
    pub bands: Vec<Band>,
    /// Reporting unit's replica after each iteration (empty unless recorded)
    pub history: Vec<WeightMatrix<W>>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl<W: Weight> ClusterRun<W> {
    /// Whether every unit ended with a bitwise-identical replica
    #[must_use]
    pub fn replicas_consistent(&self) -> bool {
        self.replicas.iter().all(|replica| replica == &self.result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Closed,
    Open,
    Aborted,
}

/// Holds spawned units until the launcher decides whether the run starts
#[derive(Debug)]
struct StartGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl StartGate {
    fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Closed),
            changed: Condvar::new(),
        }
    }

    fn set(&self, state: GateState) {
        *self.state.lock() = state;
        self.changed.notify_all();
    }

    /// Block while closed; `true` if the run may start
    fn wait(&self) -> bool {
        let mut state = self.state.lock();
        while *state == GateState::Closed {
            self.changed.wait(&mut state);
        }
        *state == GateState::Open
    }
}

/// Aborts the world if the owning unit unwinds
struct AbortOnUnwind(AbortHandle);

impl Drop for AbortOnUnwind {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// Keep the first root-cause error; abort echoes only fill an empty slot
fn record_failure(failure: &mut Option<ClusterError>, err: ClusterError) {
    let replace = failure
        .as_ref()
        .map_or(true, |prev| prev.is_abort() && !err.is_abort());
    if replace {
        *failure = Some(err);
    }
}

/// Spawn every unit behind the start gate, run them, and collect outcomes
/// in rank order
///
/// `before_spawn` runs on the launcher thread ahead of each spawn; an error
/// from it is treated as that unit's spawn failure.
fn launch_units<W: Weight>(
    seed: &WeightMatrix<W>,
    config: &ClusterConfig,
    before_spawn: impl Fn(Rank) -> io::Result<()>,
) -> Result<Vec<UnitOutcome<W>>, ClusterError> {
    let n = seed.size();
    let abort = AbortHandle::new();
    let gate = StartGate::new();

    let (spawn_failure, joined) = thread::scope(|scope| {
        let gate = &gate;
        let mut handles = Vec::with_capacity(config.units);
        let mut spawn_failure = None;

        for comm in world_with_abort::<W>(config.units, &abort) {
            let rank = comm.rank();
            let unit_seed = (rank == ROOT).then(|| seed.clone());
            let unit_abort = abort.clone();
            let spawned = before_spawn(rank).and_then(|()| {
                thread::Builder::new()
                    .name(format!("unit-{rank}"))
                    .spawn_scoped(scope, move || {
                        if !gate.wait() {
                            return Err(ClusterError::Aborted { rank });
                        }
                        let _guard = AbortOnUnwind(unit_abort.clone());
                        let outcome = run_unit(comm, unit_seed, n, config);
                        if outcome.is_err() {
                            unit_abort.abort();
                        }
                        outcome
                    })
            });
            match spawned {
                Ok(handle) => handles.push((rank, handle)),
                Err(source) => {
                    spawn_failure = Some(ClusterError::Spawn { rank, source });
                    break;
                }
            }
        }

        if spawn_failure.is_some() {
            warn!(spawned = handles.len(), "spawn failed, releasing parked units");
            abort.abort();
            gate.set(GateState::Aborted);
        } else {
            gate.set(GateState::Open);
        }

        let joined: Vec<_> = handles
            .into_iter()
            .map(|(rank, handle)| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(ClusterError::UnitPanicked { rank }))
            })
            .collect();
        (spawn_failure, joined)
    });

    if let Some(err) = spawn_failure {
        return Err(err);
    }

    let mut failure = None;
    let mut outcomes = Vec::with_capacity(joined.len());
    for outcome in joined {
        match outcome {
            Ok(unit) => outcomes.push(unit),
            Err(err) => record_failure(&mut failure, err),
        }
    }
    match failure {
        Some(err) => Err(err),
        None => Ok(outcomes),
    }
}

/// Relax `seed` across `config.units` cooperating units
///
/// # Errors
///
/// - `ClusterError::InsufficientUnits` if `config.units < 2` (nothing is
///   spawned and no relaxation happens)
/// - any error raised by a unit
///
/// # Example
///
/// ```
/// use trueno_apsp::cluster::{run_cluster, ClusterConfig};
/// use trueno_apsp::{floyd_warshall, reference_fixture};
///
/// let seed = reference_fixture::<i32>();
/// let run = run_cluster(&seed, &ClusterConfig::with_units(4)).unwrap();
/// assert_eq!(run.result, floyd_warshall(&seed));
/// assert!(run.replicas_consistent());
/// ```
pub fn run_cluster<W: Weight>(
    seed: &WeightMatrix<W>,
    config: &ClusterConfig,
) -> Result<ClusterRun<W>, ClusterError> {
    if config.units < MIN_UNITS {
        warn!(units = config.units, "refusing cluster run");
        return Err(ClusterError::InsufficientUnits {
            found: config.units,
        });
    }

    let n = seed.size();
    info!(
        units = config.units,
        n,
        band_split = ?config.band_split,
        pivot_scope = ?config.pivot_scope,
        "starting cluster run"
    );
    let started = Instant::now();

    let outcomes = launch_units(seed, config, |_| Ok(()))?;

    let mut initial = None;
    let mut history = Vec::new();
    let mut replicas = Vec::with_capacity(config.units);
    let mut bands = Vec::with_capacity(config.units);
    for unit in outcomes {
        if unit.rank == ROOT {
            initial = Some(unit.initial);
            history = unit.history;
        }
        bands.push(unit.band);
        replicas.push(unit.result);
    }

    let initial = initial.ok_or(ClusterError::MissingReport { rank: ROOT })?;
    let result = replicas
        .get(ROOT)
        .cloned()
        .ok_or(ClusterError::MissingReport { rank: ROOT })?;
    let elapsed = started.elapsed();
    info!(units = config.units, n, ?elapsed, "cluster run complete");

    Ok(ClusterRun {
        initial,
        result,
        replicas,
        bands,
        history,
        elapsed,
    })
}
