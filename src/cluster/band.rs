//! Static row bands
//!
//! The even domain owns the top half of the rows and the odd domain the
//! bottom half. How a domain's half is shared among its members depends on
//! [`BandSplit`].

use super::comm::Rank;
use super::topology::{partition_by_parity, Parity};
use std::ops::Range;

/// How rows are assigned to units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandSplit {
    /// Every member of a domain relaxes the domain's whole half
    ///
    /// Members of one domain do redundant, identical work; the reduction
    /// makes this harmless.
    #[default]
    DomainHalves,

    /// The domain's half is divided into contiguous per-member bands
    PerUnit,
}

/// Contiguous row range owned by one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    start: usize,
    end: usize,
}

impl Band {
    /// Band over `start..end`
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// First row
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// One past the last row
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Number of rows
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the band holds no rows
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether row `i` falls in the band
    #[must_use]
    pub const fn contains(&self, i: usize) -> bool {
        self.start <= i && i < self.end
    }

    /// Rows as a range
    #[must_use]
    pub const fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Rows belonging to a whole domain
///
/// Even takes `0..ceil(n/2)`, odd takes the rest, so odd `n` leaves no row
/// uncovered.
#[must_use]
pub fn domain_rows(parity: Parity, n: usize) -> Band {
    let mid = n.div_ceil(2);
    match parity {
        Parity::Even => Band::new(0, mid),
        Parity::Odd => Band::new(mid, n),
    }
}

/// Band of a world rank in a world of `world_size` units relaxing an n×n matrix
///
/// # Example
///
/// ```
/// use trueno_apsp::cluster::{band_for, BandSplit};
///
/// // 8 rows, 4 units: even ranks {0, 2} share rows 0..4, odd {1, 3} rows 4..8
/// assert_eq!(band_for(BandSplit::DomainHalves, 8, 4, 2).rows(), 0..4);
/// assert_eq!(band_for(BandSplit::PerUnit, 8, 4, 2).rows(), 2..4);
/// assert_eq!(band_for(BandSplit::PerUnit, 8, 4, 1).rows(), 4..6);
/// ```
#[must_use]
pub fn band_for(split: BandSplit, n: usize, world_size: usize, rank: Rank) -> Band {
    let parity = Parity::of(rank);
    let half = domain_rows(parity, n);
    match split {
        BandSplit::DomainHalves => half,
        BandSplit::PerUnit => {
            let (even, odd) = partition_by_parity(world_size);
            let members = match parity {
                Parity::Even => even,
                Parity::Odd => odd,
            };
            let Some(index) = members.iter().position(|&m| m == rank) else {
                return Band::new(half.start(), half.start());
            };
            let count = members.len();
            let len = half.len();
            Band::new(
                half.start() + len * index / count,
                half.start() + len * (index + 1) / count,
            )
        }
    }
}

/// Lowest world rank whose band contains row `k`
#[must_use]
pub fn row_owner(split: BandSplit, n: usize, world_size: usize, k: usize) -> Option<Rank> {
    (0..world_size).find(|&rank| band_for(split, n, world_size, rank).contains(k))
}
