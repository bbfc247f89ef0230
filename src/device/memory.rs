//! Device memory regions
//!
//! The matrix and the two staging vectors live in 32-bit atomic cells so
//! every lane can read and write them through a shared reference. Lanes only
//! ever touch disjoint indices between barriers, so relaxed ordering is
//! enough; the barriers provide the happens-before edges.

use crate::matrix::{Weight, WeightMatrix};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

/// Weight that fits a 32-bit device cell
pub trait DeviceScalar: Weight {
    /// Raw cell bits
    fn to_bits(self) -> u32;

    /// Weight from raw cell bits
    fn from_bits(bits: u32) -> Self;
}

impl DeviceScalar for f32 {
    fn to_bits(self) -> u32 {
        f32::to_bits(self)
    }

    fn from_bits(bits: u32) -> Self {
        f32::from_bits(bits)
    }
}

impl DeviceScalar for i32 {
    fn to_bits(self) -> u32 {
        u32::from_ne_bytes(self.to_ne_bytes())
    }

    fn from_bits(bits: u32) -> Self {
        i32::from_ne_bytes(bits.to_ne_bytes())
    }
}

fn allocate(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

/// n×n matrix resident in device memory
#[derive(Debug)]
pub struct DeviceMatrix<W> {
    n: usize,
    cells: Vec<AtomicU32>,
    _weight: PhantomData<W>,
}

impl<W: DeviceScalar> DeviceMatrix<W> {
    /// Copy a host matrix to the device
    #[must_use]
    pub fn upload(host: &WeightMatrix<W>) -> Self {
        let cells = host
            .as_slice()
            .iter()
            .map(|&w| AtomicU32::new(w.to_bits()))
            .collect();
        Self {
            n: host.size(),
            cells,
            _weight: PhantomData,
        }
    }

    /// Copy the device matrix back to the host, releasing the region
    #[must_use]
    pub fn download(self) -> WeightMatrix<W> {
        WeightMatrix::from_fn(self.n, |i, j| self.load(i, j))
    }

    /// Matrix dimension
    #[must_use]
    pub const fn size(&self) -> usize {
        self.n
    }

    /// Read cell `(i, j)`
    #[must_use]
    pub fn load(&self, i: usize, j: usize) -> W {
        W::from_bits(self.cells[i * self.n + j].load(Ordering::Relaxed))
    }

    /// Write cell `(i, j)`
    pub fn store(&self, i: usize, j: usize, weight: W) {
        self.cells[i * self.n + j].store(weight.to_bits(), Ordering::Relaxed);
    }
}

/// Per-phase staging vectors: column `k` and row `k`
#[derive(Debug)]
pub struct StagingBuffers<W> {
    column: Vec<AtomicU32>,
    row: Vec<AtomicU32>,
    _weight: PhantomData<W>,
}

impl<W: DeviceScalar> StagingBuffers<W> {
    /// Allocate both vectors for an n×n matrix
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            column: allocate(n),
            row: allocate(n),
            _weight: PhantomData,
        }
    }

    /// Staged `D[i][k]`
    #[must_use]
    pub fn column(&self, i: usize) -> W {
        W::from_bits(self.column[i].load(Ordering::Relaxed))
    }

    /// Stage `D[i][k]`
    pub fn set_column(&self, i: usize, weight: W) {
        self.column[i].store(weight.to_bits(), Ordering::Relaxed);
    }

    /// Staged `D[k][j]`
    #[must_use]
    pub fn row(&self, j: usize) -> W {
        W::from_bits(self.row[j].load(Ordering::Relaxed))
    }

    /// Stage `D[k][j]`
    pub fn set_row(&self, j: usize, weight: W) {
        self.row[j].store(weight.to_bits(), Ordering::Relaxed);
    }
}

/// Upload `host`, run `f` against the device copy, then copy it back
///
/// The device region exists only for the duration of `f`; the host matrix
/// is updated even if `f` returns an error value.
pub fn with_device_matrix<W: DeviceScalar, R>(
    host: &mut WeightMatrix<W>,
    f: impl FnOnce(&DeviceMatrix<W>) -> R,
) -> R {
    let device = DeviceMatrix::upload(host);
    let outcome = f(&device);
    *host = device.download();
    outcome
}
