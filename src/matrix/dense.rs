//! Dense n×n weight matrix
//!
//! Row-major storage, the same layout on every execution unit and on the
//! device, so a replica can be broadcast or reduced as one flat slice.
//!
//! ```text
//! n = 3
//!   cells: [d00, d01, d02, d10, d11, d12, d20, d21, d22]
//!   row(1) = cells[3..6]
//! ```

use super::Weight;
use std::fmt;
use thiserror::Error;

/// Matrix construction and access errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    /// Flat cell buffer does not hold n×n values
    #[error("expected {expected} cells for a square matrix, found {found}")]
    LengthMismatch {
        /// Required number of cells
        expected: usize,
        /// Cells supplied
        found: usize,
    },

    /// A row has a different length from the number of rows
    #[error("row {row} has {found} columns, expected {expected}")]
    NotSquare {
        /// Offending row index
        row: usize,
        /// Required row length
        expected: usize,
        /// Actual row length
        found: usize,
    },

    /// Cell index outside the matrix
    #[error("cell ({row}, {col}) is outside a {size}x{size} matrix")]
    OutOfBounds {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
        /// Matrix dimension
        size: usize,
    },
}

/// Dense all-pairs weight matrix
///
/// # Example
///
/// ```
/// use trueno_apsp::WeightMatrix;
///
/// let m = WeightMatrix::from_rows(&[[0, 3], [1, 0]]).unwrap();
/// assert_eq!(m.size(), 2);
/// assert_eq!(m.get(0, 1), Some(3));
/// assert_eq!(m.column(0), vec![0, 1]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix<W> {
    n: usize,
    cells: Vec<W>,
}

impl<W: Weight> WeightMatrix<W> {
    /// Matrix with no edges: unreachable everywhere except a zero diagonal
    #[must_use]
    pub fn new(n: usize) -> Self {
        let mut cells = vec![W::UNREACHABLE; n * n];
        for i in 0..n {
            cells[i * n + i] = W::ZERO;
        }
        Self { n, cells }
    }

    /// All-zero matrix, used as a receive buffer before a broadcast
    #[must_use]
    pub fn zeroed(n: usize) -> Self {
        Self {
            n,
            cells: vec![W::ZERO; n * n],
        }
    }

    /// Matrix whose cell `(i, j)` is `weight(i, j)`
    #[must_use]
    pub fn from_fn(n: usize, mut weight: impl FnMut(usize, usize) -> W) -> Self {
        let cells = (0..n * n).map(|idx| weight(idx / n, idx % n)).collect();
        Self { n, cells }
    }

    /// Wrap a row-major cell buffer
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::LengthMismatch` if `cells.len() != n * n`
    pub fn from_row_major(n: usize, cells: Vec<W>) -> Result<Self, MatrixError> {
        if cells.len() != n * n {
            return Err(MatrixError::LengthMismatch {
                expected: n * n,
                found: cells.len(),
            });
        }
        Ok(Self { n, cells })
    }

    /// Build from a list of rows
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::NotSquare` if any row length differs from the row count
    pub fn from_rows<R: AsRef<[W]>>(rows: &[R]) -> Result<Self, MatrixError> {
        let n = rows.len();
        let mut cells = Vec::with_capacity(n * n);
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != n {
                return Err(MatrixError::NotSquare {
                    row,
                    expected: n,
                    found: values.len(),
                });
            }
            cells.extend_from_slice(values);
        }
        Ok(Self { n, cells })
    }

    /// Number of vertices (rows and columns)
    #[must_use]
    pub const fn size(&self) -> usize {
        self.n
    }

    /// Weight of edge `row → col`
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<W> {
        if row >= self.n || col >= self.n {
            return None;
        }
        self.cells.get(row * self.n + col).copied()
    }

    /// Overwrite the weight of edge `row → col`
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::OutOfBounds` for an index outside the matrix
    pub fn set(&mut self, row: usize, col: usize, weight: W) -> Result<(), MatrixError> {
        if row >= self.n || col >= self.n {
            return Err(MatrixError::OutOfBounds {
                row,
                col,
                size: self.n,
            });
        }
        self.cells[row * self.n + col] = weight;
        Ok(())
    }

    /// Row `k` as a slice
    ///
    /// # Panics
    ///
    /// Panics if `k >= size()`
    #[must_use]
    pub fn row(&self, k: usize) -> &[W] {
        &self.cells[k * self.n..(k + 1) * self.n]
    }

    /// Mutable row `k`
    ///
    /// # Panics
    ///
    /// Panics if `k >= size()`
    pub fn row_mut(&mut self, k: usize) -> &mut [W] {
        &mut self.cells[k * self.n..(k + 1) * self.n]
    }

    /// Column `k` copied out (columns are strided in row-major storage)
    ///
    /// # Panics
    ///
    /// Panics if `k >= size()`
    #[must_use]
    pub fn column(&self, k: usize) -> Vec<W> {
        assert!(k < self.n, "column {k} out of range for size {}", self.n);
        self.cells.iter().skip(k).step_by(self.n).copied().collect()
    }

    /// Iterate rows top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[W]> {
        self.cells.chunks(self.n.max(1))
    }

    /// Flat row-major view
    #[must_use]
    pub fn as_slice(&self) -> &[W] {
        &self.cells
    }

    /// Flat row-major mutable view (collective send/receive buffer)
    pub fn as_mut_slice(&mut self) -> &mut [W] {
        &mut self.cells
    }

    /// Convert every cell to another weight type
    #[must_use]
    pub fn map<V: Weight>(&self, f: impl Fn(W) -> V) -> WeightMatrix<V> {
        WeightMatrix {
            n: self.n,
            cells: self.cells.iter().map(|&w| f(w)).collect(),
        }
    }

    /// Element-wise minimum with another replica, in place
    ///
    /// # Errors
    ///
    /// Returns `MatrixError::LengthMismatch` if the sizes differ
    pub fn min_assign(&mut self, other: &Self) -> Result<(), MatrixError> {
        if other.n != self.n {
            return Err(MatrixError::LengthMismatch {
                expected: self.cells.len(),
                found: other.cells.len(),
            });
        }
        for (cell, &theirs) in self.cells.iter_mut().zip(&other.cells) {
            *cell = cell.min_weight(theirs);
        }
        Ok(())
    }

    /// True when every cell of `self` is `<=` the matching cell of `other`
    ///
    /// A later relaxation snapshot must always be pointwise `<=` an earlier one.
    #[must_use]
    pub fn is_pointwise_le(&self, other: &Self) -> bool {
        self.n == other.n && self.cells.iter().zip(&other.cells).all(|(a, b)| a <= b)
    }

    /// Compare within an absolute tolerance (exact match for equal infinities)
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.n == other.n
            && self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(&a, &b)| a == b || (a.to_f64() - b.to_f64()).abs() <= epsilon)
    }

    /// Check `D[i][j] <= D[i][k] + D[k][j]` for every triple
    #[must_use]
    pub fn satisfies_triangle_inequality(&self) -> bool {
        let n = self.n;
        (0..n).all(|k| {
            (0..n).all(|i| {
                let via = self.cells[i * n + k];
                (0..n).all(|j| self.cells[i * n + j] <= via.path_sum(self.cells[k * n + j]))
            })
        })
    }
}

impl<W: Weight> fmt::Display for WeightMatrix<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.n == 0 {
            return Ok(());
        }
        for row in self.rows() {
            for cell in row {
                write!(f, "{cell:>4} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
