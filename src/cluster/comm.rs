//! In-process collective communication
//!
//! Execution units are OS threads that never share a replica. Everything
//! crossing a unit boundary goes through a [`Communicator`]: a rank inside a
//! fixed-size group plus a handle to the group's fabric (one barrier and one
//! slot per rank).
//!
//! Every collective is two barrier phases:
//!
//! ```text
//! deposit ──► barrier ──► read peers' slots ──► barrier
//! ```
//!
//! The second barrier keeps a fast rank from overwriting its slot for the
//! next collective while a slow rank is still reading it. Barriers never
//! time out: a rank that skips a collective stalls its whole group until
//! someone calls [`AbortHandle::abort`], which fails every pending and
//! future collective in the world and in every group carved from it.

use crate::matrix::Weight;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::trace;

/// Unit identity within a communicator
pub type Rank = usize;

/// Collective call errors
///
/// Every rank of a group sees the same error for the same call, so an error
/// never leaves part of the group waiting at a barrier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommError {
    /// Broadcast root is not a member of the communicator
    #[error("root rank {root} is outside a communicator of size {size}")]
    RootOutOfRange {
        /// Requested root
        root: Rank,
        /// Communicator size
        size: usize,
    },

    /// Buffer length differs between participants
    #[error("rank {rank}: collective buffer holds {found} values, peer sent {expected}")]
    LengthMismatch {
        /// Rank that detected the mismatch
        rank: Rank,
        /// Length deposited by the peer
        expected: usize,
        /// Local buffer length
        found: usize,
    },

    /// Membership list is empty, unsorted, duplicated, or out of range
    #[error("invalid group membership {members:?} for communicator of size {size}")]
    InvalidGroup {
        /// Offending membership list
        members: Vec<Rank>,
        /// Parent communicator size
        size: usize,
    },

    /// The run was aborted while this rank was in, or entering, a collective
    #[error("collective aborted: a peer unit failed")]
    Aborted,
}

type GroupKey = (u64, Vec<Rank>);

#[derive(Debug, Default)]
struct PhaseState {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

/// Reusable barrier that can be broken from outside
#[derive(Debug)]
struct PhaseBarrier {
    size: usize,
    state: Mutex<PhaseState>,
    released: Condvar,
}

impl PhaseBarrier {
    fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(PhaseState::default()),
            released: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<(), CommError> {
        let mut state = self.state.lock();
        if state.aborted {
            return Err(CommError::Aborted);
        }

        let generation = state.generation;
        state.arrived += 1;
        if state.arrived >= self.size {
            state.arrived = 0;
            state.generation += 1;
            self.released.notify_all();
            return Ok(());
        }

        while state.generation == generation && !state.aborted {
            self.released.wait(&mut state);
        }
        if state.generation == generation {
            Err(CommError::Aborted)
        } else {
            Ok(())
        }
    }

    fn abort(&self) {
        self.state.lock().aborted = true;
        self.released.notify_all();
    }
}

#[derive(Debug, Default)]
struct AbortRegistry {
    aborted: bool,
    barriers: Vec<Weak<PhaseBarrier>>,
}

/// Cancels every collective of one world and of the groups carved from it
///
/// Cloning shares the same signal. Aborting is permanent.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    registry: Arc<Mutex<AbortRegistry>>,
}

impl AbortHandle {
    /// Fresh, un-aborted signal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every blocked and future collective with `CommError::Aborted`
    pub fn abort(&self) {
        let barriers: Vec<_> = {
            let mut registry = self.registry.lock();
            registry.aborted = true;
            registry.barriers.drain(..).filter_map(|b| b.upgrade()).collect()
        };
        for barrier in barriers {
            barrier.abort();
        }
    }

    /// Whether [`abort`](Self::abort) has been called
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.registry.lock().aborted
    }

    fn register(&self, barrier: &Arc<PhaseBarrier>) {
        let mut registry = self.registry.lock();
        if registry.aborted {
            barrier.abort();
        } else {
            registry.barriers.retain(|b| b.strong_count() > 0);
            registry.barriers.push(Arc::downgrade(barrier));
        }
    }
}

struct Fabric<W> {
    barrier: Arc<PhaseBarrier>,
    abort: AbortHandle,
    slots: Vec<RwLock<Vec<W>>>,
    subgroups: Mutex<HashMap<GroupKey, Arc<Fabric<W>>>>,
}

impl<W> Fabric<W> {
    fn new(size: usize, abort: AbortHandle) -> Self {
        let barrier = Arc::new(PhaseBarrier::new(size));
        abort.register(&barrier);
        Self {
            barrier,
            abort,
            slots: (0..size).map(|_| RwLock::new(Vec::new())).collect(),
            subgroups: Mutex::new(HashMap::new()),
        }
    }
}

/// One unit's handle to a communication group
///
/// Handles are not `Clone`: each rank owns exactly one, and dropping it is
/// how a unit releases the group.
pub struct Communicator<W> {
    rank: Rank,
    size: usize,
    label: String,
    fabric: Arc<Fabric<W>>,
    groups_created: u64,
}

/// Create the world group: one handle per unit, handle `r` has rank `r`
///
/// # Example
///
/// ```
/// use trueno_apsp::cluster::world;
///
/// let handles = world::<i32>(3);
/// assert_eq!(handles.len(), 3);
/// assert_eq!(handles[2].rank(), 2);
/// assert_eq!(handles[0].size(), 3);
/// ```
#[must_use]
pub fn world<W: Weight>(size: usize) -> Vec<Communicator<W>> {
    world_with_abort(size, &AbortHandle::new())
}

/// Create the world group wired to an existing [`AbortHandle`]
#[must_use]
pub fn world_with_abort<W: Weight>(size: usize, abort: &AbortHandle) -> Vec<Communicator<W>> {
    let fabric = Arc::new(Fabric::new(size, abort.clone()));
    (0..size)
        .map(|rank| Communicator {
            rank,
            size,
            label: "world".to_string(),
            fabric: Arc::clone(&fabric),
            groups_created: 0,
        })
        .collect()
}

impl<W: Weight> Communicator<W> {
    /// This unit's rank in the group
    #[must_use]
    pub const fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of units in the group
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Group name (for logs)
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Signal shared by this group, its world and its sibling groups
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.fabric.abort.clone()
    }

    /// Block until every rank in the group has arrived
    ///
    /// # Errors
    ///
    /// Returns `CommError::Aborted` if the run is aborted first
    pub fn barrier(&self) -> Result<(), CommError> {
        self.fabric.barrier.wait()
    }

    /// Copy `buf` from `root` into every other rank's `buf`
    ///
    /// # Errors
    ///
    /// - `RootOutOfRange` if `root >= size()` (no rank blocks)
    /// - `LengthMismatch` on a rank whose buffer length differs from root's
    /// - `Aborted` if the run is aborted before the exchange completes
    pub fn broadcast(&self, buf: &mut [W], root: Rank) -> Result<(), CommError> {
        if root >= self.size {
            return Err(CommError::RootOutOfRange {
                root,
                size: self.size,
            });
        }

        if self.rank == root {
            let mut slot = self.fabric.slots[root].write();
            slot.clear();
            slot.extend_from_slice(buf);
        }
        self.fabric.barrier.wait()?;

        let mut outcome = Ok(());
        if self.rank != root {
            let slot = self.fabric.slots[root].read();
            if slot.len() == buf.len() {
                buf.copy_from_slice(&slot);
            } else {
                outcome = Err(CommError::LengthMismatch {
                    rank: self.rank,
                    expected: slot.len(),
                    found: buf.len(),
                });
            }
        }
        self.fabric.barrier.wait()?;

        trace!(group = %self.label, rank = self.rank, root, len = buf.len(), "broadcast");
        outcome
    }

    /// Replace `buf` with the element-wise minimum over every rank's `buf`
    ///
    /// Every rank folds the slots in rank order, so all ranks end with
    /// bitwise-identical buffers.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if any rank's buffer length differs, or
    /// `Aborted` if the run is aborted before the exchange completes
    pub fn all_reduce_min(&self, buf: &mut [W]) -> Result<(), CommError> {
        {
            let mut slot = self.fabric.slots[self.rank].write();
            slot.clear();
            slot.extend_from_slice(buf);
        }
        self.fabric.barrier.wait()?;

        let mut outcome = Ok(());
        for (peer, slot) in self.fabric.slots.iter().enumerate() {
            let slot = slot.read();
            if slot.len() != buf.len() {
                outcome = Err(CommError::LengthMismatch {
                    rank: self.rank,
                    expected: slot.len(),
                    found: buf.len(),
                });
                break;
            }
            if peer == 0 {
                buf.copy_from_slice(&slot);
            } else {
                for (cell, &theirs) in buf.iter_mut().zip(slot.iter()) {
                    *cell = cell.min_weight(theirs);
                }
            }
        }
        self.fabric.barrier.wait()?;

        trace!(group = %self.label, rank = self.rank, len = buf.len(), "all_reduce_min");
        outcome
    }

    /// Carve a subgroup out of this group
    ///
    /// Collective over the parent: every parent rank must call it with the
    /// same `members`. Members get `Some(handle)` ranked by their position in
    /// `members`; everyone else gets `None`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGroup` unless `members` is non-empty, strictly
    /// increasing and within range (checked before any rank blocks), and
    /// `Aborted` if the run is aborted while the group is being formed
    pub fn create_subcommunicator(
        &mut self,
        members: &[Rank],
        label: &str,
    ) -> Result<Option<Self>, CommError> {
        let well_formed = !members.is_empty()
            && members.windows(2).all(|pair| pair[0] < pair[1])
            && members.iter().all(|&m| m < self.size);
        if !well_formed {
            return Err(CommError::InvalidGroup {
                members: members.to_vec(),
                size: self.size,
            });
        }

        let key: GroupKey = (self.groups_created, members.to_vec());
        self.groups_created += 1;

        self.fabric.barrier.wait()?;
        let handle = members
            .iter()
            .position(|&member| member == self.rank)
            .map(|local_rank| {
                let fabric = Arc::clone(
                    self.fabric
                        .subgroups
                        .lock()
                        .entry(key.clone())
                        .or_insert_with(|| {
                            Arc::new(Fabric::new(members.len(), self.fabric.abort.clone()))
                        }),
                );
                Self {
                    rank: local_rank,
                    size: members.len(),
                    label: label.to_string(),
                    fabric,
                    groups_created: 0,
                }
            });
        self.fabric.barrier.wait()?;

        // Every member holds its clone by now
        if self.rank == 0 {
            self.fabric.subgroups.lock().remove(&key);
        }

        trace!(
            parent = %self.label,
            rank = self.rank,
            group = label,
            member = handle.is_some(),
            "create_subcommunicator"
        );
        Ok(handle)
    }
}

impl<W> fmt::Debug for Communicator<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("label", &self.label)
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
