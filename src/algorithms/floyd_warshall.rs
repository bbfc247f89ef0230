//! Floyd–Warshall by min-plus relaxation
//!
//! Single-threaded reference for every concurrent substrate in this crate:
//! - `relax_band`: one pivot applied to a row range (the per-unit kernel)
//! - `floyd_warshall`: all n pivots over the whole matrix
//! - `relaxation_history`: snapshots after every pivot
//!
//! # Example
//!
//! ```
//! use trueno_apsp::{floyd_warshall, WeightMatrix};
//!
//! // 0 --1--> 1 --2--> 2, plus a direct 0 --5--> 2
//! let inf = i32::MAX;
//! let m = WeightMatrix::from_rows(&[[0, 1, 5], [inf, 0, 2], [inf, inf, 0]]).unwrap();
//!
//! let d = floyd_warshall(&m);
//! assert_eq!(d.get(0, 2), Some(3)); // 0→1→2 = 3, not 0→2 = 5
//! assert_eq!(d.get(2, 0), Some(inf)); // unreachable stays unreachable
//! ```

use crate::matrix::{Weight, WeightMatrix};
use std::ops::Range;

/// Apply pivot `k` to the rows in `rows`
///
/// For every `i` in `rows` and every column `j`:
/// `D[i][j] = min(D[i][j], D[i][k] + pivot_row[j])`.
///
/// `D[i][k]` is re-read per cell, so the update of column `k` itself is
/// visible to later columns of the same row. Rows past the end of the matrix
/// are ignored.
///
/// # Panics
///
/// Panics if `k >= matrix.size()` or `pivot_row` is shorter than the matrix.
pub fn relax_band<W: Weight>(
    matrix: &mut WeightMatrix<W>,
    rows: Range<usize>,
    k: usize,
    pivot_row: &[W],
) {
    let n = matrix.size();
    debug_assert_eq!(pivot_row.len(), n, "pivot row length must match matrix");
    let end = rows.end.min(n);
    for i in rows.start..end {
        let row = matrix.row_mut(i);
        for j in 0..n {
            let via_k = row[k].path_sum(pivot_row[j]);
            row[j] = row[j].min_weight(via_k);
        }
    }
}

/// Apply pivot `k` to every row, using the current row `k` as the pivot
pub fn relax_pivot<W: Weight>(matrix: &mut WeightMatrix<W>, k: usize) {
    let pivot_row = matrix.row(k).to_vec();
    let n = matrix.size();
    relax_band(matrix, 0..n, k, &pivot_row);
}

/// Run all `n` pivots in place
pub fn floyd_warshall_in_place<W: Weight>(matrix: &mut WeightMatrix<W>) {
    for k in 0..matrix.size() {
        relax_pivot(matrix, k);
    }
}

/// All-pairs shortest path distances
///
/// # Complexity
///
/// O(n³) time, O(n²) extra space for the returned copy
#[must_use]
pub fn floyd_warshall<W: Weight>(matrix: &WeightMatrix<W>) -> WeightMatrix<W> {
    let mut result = matrix.clone();
    floyd_warshall_in_place(&mut result);
    result
}

/// Matrix after every pivot
///
/// Entry 0 is the input; entry `k + 1` is the matrix after pivot `k`.
#[must_use]
pub fn relaxation_history<W: Weight>(matrix: &WeightMatrix<W>) -> Vec<WeightMatrix<W>> {
    let mut current = matrix.clone();
    let mut history = Vec::with_capacity(matrix.size() + 1);
    history.push(current.clone());
    for k in 0..matrix.size() {
        relax_pivot(&mut current, k);
        history.push(current.clone());
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::seed::reference_fixture;

    const INF: i32 = i32::MAX;

    #[test]
    fn test_empty_matrix() {
        let m: WeightMatrix<i32> = WeightMatrix::new(0);
        assert_eq!(floyd_warshall(&m).size(), 0);
        assert_eq!(relaxation_history(&m).len(), 1);
    }

    #[test]
    fn test_single_vertex() {
        let m: WeightMatrix<f32> = WeightMatrix::new(1);
        assert_eq!(floyd_warshall(&m).get(0, 0), Some(0.0));
    }

    #[test]
    fn test_shorter_path_via_intermediate() {
        let m = WeightMatrix::from_rows(&[[0, 1, 5], [INF, 0, 2], [INF, INF, 0]]).unwrap();
        let d = floyd_warshall(&m);
        assert_eq!(d.get(0, 2), Some(3));
        assert_eq!(d.get(1, 0), Some(INF));
    }

    #[test]
    fn test_chain_reaches_end() {
        // 0 → 1 → 2 → 3, each weight 1; pivots processed out of path order
        let m = WeightMatrix::from_rows(&[
            [0, INF, INF, INF],
            [INF, 0, INF, INF],
            [INF, INF, 0, INF],
            [INF, INF, INF, 0],
        ])
        .unwrap();
        let mut m = m;
        m.set(3, 2, 1).unwrap();
        m.set(2, 1, 1).unwrap();
        m.set(1, 0, 1).unwrap();
        let d = floyd_warshall(&m);
        assert_eq!(d.get(3, 0), Some(3));
        assert_eq!(d.get(0, 3), Some(INF));
    }

    #[test]
    fn test_band_only_touches_its_rows() {
        let mut m = WeightMatrix::from_rows(&[[0, 1, 9], [1, 0, 1], [9, 1, 0]]).unwrap();
        let pivot = m.row(1).to_vec();
        relax_band(&mut m, 0..1, 1, &pivot);
        assert_eq!(m.get(0, 2), Some(2));
        assert_eq!(m.get(2, 0), Some(9)); // row 2 is outside the band
    }

    #[test]
    fn test_band_past_end_is_clamped() {
        let mut m = WeightMatrix::from_rows(&[[0, 4], [1, 0]]).unwrap();
        let pivot = m.row(0).to_vec();
        relax_band(&mut m, 1..10, 0, &pivot);
        assert_eq!(m.get(1, 1), Some(0));
    }

    #[test]
    fn test_fixture_result() {
        let d = floyd_warshall(&reference_fixture::<i32>());
        let expected = WeightMatrix::from_rows(&[
            [0, 2, 6, 3, 7, 5, 4, 5],
            [2, 0, 4, 1, 5, 5, 3, 4],
            [6, 4, 0, 5, 2, 5, 6, 7],
            [3, 1, 5, 0, 4, 6, 4, 5],
            [7, 5, 2, 4, 0, 3, 5, 6],
            [5, 5, 5, 6, 3, 0, 2, 3],
            [4, 3, 6, 4, 5, 2, 0, 1],
            [5, 4, 7, 5, 6, 3, 1, 0],
        ])
        .unwrap();
        assert_eq!(d, expected);
        assert!(d.satisfies_triangle_inequality());
    }

    #[test]
    fn test_history_is_monotone() {
        let history = relaxation_history(&reference_fixture::<i32>());
        assert_eq!(history.len(), 9);
        for pair in history.windows(2) {
            assert!(pair[1].is_pointwise_le(&pair[0]));
        }
    }

    #[test]
    fn test_idempotent_on_converged() {
        let d = floyd_warshall(&reference_fixture::<f64>());
        assert_eq!(floyd_warshall(&d), d);
    }
}
