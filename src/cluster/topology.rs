//! Group topology: parity-partitioned communication domains
//!
//! The world is split once, at startup, into two disjoint domains by rank
//! parity. Every unit learns both domains' membership, but holds a live
//! handle only for its own; the other domain's handle is `None`, so a
//! domain-scoped collective can only be reached through `if let Some(..)`.

use super::comm::{CommError, Communicator, Rank};
use crate::matrix::Weight;
use thiserror::Error;
use tracing::debug;

/// Fewest units a partitioned run accepts
pub const MIN_UNITS: usize = 2;

/// Topology construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// Fewer than [`MIN_UNITS`] units in the world
    #[error("need at least {MIN_UNITS} execution units, found {found}")]
    InsufficientUnits {
        /// World size
        found: usize,
    },

    /// Subgroup creation failed
    #[error(transparent)]
    Comm(#[from] CommError),
}

/// Which half of the world a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    /// Even world ranks
    Even,
    /// Odd world ranks
    Odd,
}

impl Parity {
    /// Parity of a world rank
    #[must_use]
    pub const fn of(rank: Rank) -> Self {
        if rank % 2 == 0 {
            Self::Even
        } else {
            Self::Odd
        }
    }

    /// Domain name used in logs and communicator labels
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Even => "even",
            Self::Odd => "odd",
        }
    }
}

/// Membership metadata of one domain (known to every unit)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitGroup {
    parity: Parity,
    members: Vec<Rank>,
}

impl UnitGroup {
    /// Domain parity
    #[must_use]
    pub const fn parity(&self) -> Parity {
        self.parity
    }

    /// World ranks in the domain, ascending
    #[must_use]
    pub fn members(&self) -> &[Rank] {
        &self.members
    }

    /// Position of a world rank inside the domain
    #[must_use]
    pub fn local_rank(&self, world_rank: Rank) -> Option<Rank> {
        self.members.iter().position(|&m| m == world_rank)
    }

    /// Whether a world rank belongs to the domain
    #[must_use]
    pub fn contains(&self, world_rank: Rank) -> bool {
        self.local_rank(world_rank).is_some()
    }
}

/// A domain as seen from one unit: metadata plus an optional handle
#[derive(Debug)]
pub struct CommunicationDomain<W> {
    group: UnitGroup,
    handle: Option<Communicator<W>>,
}

impl<W: Weight> CommunicationDomain<W> {
    /// Membership metadata
    #[must_use]
    pub const fn group(&self) -> &UnitGroup {
        &self.group
    }

    /// Handle for collectives, `None` when this unit is not a member
    #[must_use]
    pub const fn handle(&self) -> Option<&Communicator<W>> {
        self.handle.as_ref()
    }
}

/// Split `0..size` into (even ranks, odd ranks)
///
/// # Example
///
/// ```
/// use trueno_apsp::cluster::partition_by_parity;
///
/// let (even, odd) = partition_by_parity(5);
/// assert_eq!(even, vec![0, 2, 4]);
/// assert_eq!(odd, vec![1, 3]);
/// ```
#[must_use]
pub fn partition_by_parity(size: usize) -> (Vec<Rank>, Vec<Rank>) {
    (0..size).partition(|&rank| Parity::of(rank) == Parity::Even)
}

/// Both domains as seen from one unit
#[derive(Debug)]
pub struct Topology<W> {
    world_rank: Rank,
    world_size: usize,
    even: CommunicationDomain<W>,
    odd: CommunicationDomain<W>,
}

impl<W: Weight> Topology<W> {
    /// Build the even/odd domains
    ///
    /// Collective over `world`: every unit must call it once, before any
    /// domain-scoped collective.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::InsufficientUnits` if the world has fewer than
    /// [`MIN_UNITS`] units. The check happens before any rank blocks, so
    /// every unit returns the same error.
    pub fn build(world: &mut Communicator<W>) -> Result<Self, TopologyError> {
        if world.size() < MIN_UNITS {
            return Err(TopologyError::InsufficientUnits {
                found: world.size(),
            });
        }

        let (even_ranks, odd_ranks) = partition_by_parity(world.size());
        let even_handle = world.create_subcommunicator(&even_ranks, Parity::Even.label())?;
        let odd_handle = world.create_subcommunicator(&odd_ranks, Parity::Odd.label())?;

        debug!(
            rank = world.rank(),
            parity = Parity::of(world.rank()).label(),
            even = even_ranks.len(),
            odd = odd_ranks.len(),
            "topology built"
        );

        Ok(Self {
            world_rank: world.rank(),
            world_size: world.size(),
            even: CommunicationDomain {
                group: UnitGroup {
                    parity: Parity::Even,
                    members: even_ranks,
                },
                handle: even_handle,
            },
            odd: CommunicationDomain {
                group: UnitGroup {
                    parity: Parity::Odd,
                    members: odd_ranks,
                },
                handle: odd_handle,
            },
        })
    }

    /// World rank of this unit
    #[must_use]
    pub const fn world_rank(&self) -> Rank {
        self.world_rank
    }

    /// World size
    #[must_use]
    pub const fn world_size(&self) -> usize {
        self.world_size
    }

    /// This unit's parity
    #[must_use]
    pub const fn parity(&self) -> Parity {
        Parity::of(self.world_rank)
    }

    /// Domain by parity
    #[must_use]
    pub const fn domain(&self, parity: Parity) -> &CommunicationDomain<W> {
        match parity {
            Parity::Even => &self.even,
            Parity::Odd => &self.odd,
        }
    }

    /// Both domains, even first
    pub fn domains(&self) -> impl Iterator<Item = &CommunicationDomain<W>> {
        [&self.even, &self.odd].into_iter()
    }

    /// This unit's own domain
    #[must_use]
    pub const fn local(&self) -> &CommunicationDomain<W> {
        self.domain(self.parity())
    }

    /// Release both domain handles
    pub fn release(self) {
        debug!(rank = self.world_rank, "releasing communication domains");
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::comm::world;
    use std::thread;

    fn build_all(size: usize) -> Vec<Result<Topology<i32>, TopologyError>> {
        thread::scope(|scope| {
            let joins: Vec<_> = world::<i32>(size)
                .into_iter()
                .map(|mut comm| scope.spawn(move || Topology::build(&mut comm)))
                .collect();
            joins.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn test_partition_by_parity() {
        assert_eq!(partition_by_parity(2), (vec![0], vec![1]));
        assert_eq!(partition_by_parity(6), (vec![0, 2, 4], vec![1, 3, 5]));
    }

    #[test]
    fn test_single_unit_rejected() {
        let out = build_all(1);
        assert_eq!(out.len(), 1);
        assert!(matches!(
            out[0],
            Err(TopologyError::InsufficientUnits { found: 1 })
        ));
    }

    #[test]
    fn test_each_unit_holds_only_its_own_handle() {
        for topology in build_all(5) {
            let topology = topology.unwrap();
            let rank = topology.world_rank();
            for domain in topology.domains() {
                let member = domain.group().contains(rank);
                assert_eq!(domain.handle().is_some(), member, "rank {rank}");
            }
            let local = topology.local();
            assert_eq!(local.group().parity(), Parity::of(rank));
            let handle = local.handle().unwrap();
            assert_eq!(Some(handle.rank()), local.group().local_rank(rank));
            assert_eq!(handle.size(), local.group().members().len());
        }
    }

    #[test]
    fn test_every_unit_sees_both_groups() {
        for topology in build_all(4) {
            let topology = topology.unwrap();
            assert_eq!(topology.domain(Parity::Even).group().members(), &[0, 2]);
            assert_eq!(topology.domain(Parity::Odd).group().members(), &[1, 3]);
            topology.release();
        }
    }

    #[test]
    fn test_parity_labels() {
        assert_eq!(Parity::of(4), Parity::Even);
        assert_eq!(Parity::of(7).label(), "odd");
    }
}
