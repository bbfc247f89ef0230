//! Seed matrices
//!
//! Two ways to start a run: the literal 8×8 reference fixture, or a
//! deterministic pseudo-random fill with positive off-diagonal weights.

use super::{Weight, WeightMatrix};

/// Dimension of the reference fixture
pub const FIXTURE_SIZE: usize = 8;

/// Literal 8×8 reference fixture
pub const REFERENCE_FIXTURE: [[i32; FIXTURE_SIZE]; FIXTURE_SIZE] = [
    [0, 2, 9, 3, 8, 5, 4, 7],
    [2, 0, 4, 1, 7, 6, 3, 5],
    [9, 4, 0, 5, 2, 9, 6, 8],
    [3, 1, 5, 0, 4, 8, 7, 9],
    [8, 7, 2, 4, 0, 3, 5, 6],
    [5, 6, 9, 8, 3, 0, 2, 4],
    [4, 3, 6, 7, 5, 2, 0, 1],
    [7, 5, 8, 9, 6, 4, 1, 0],
];

/// Largest off-diagonal weight produced by [`random_positive`]
pub const MAX_RANDOM_WEIGHT: u32 = 100;

/// The reference fixture as a matrix of any weight type
///
/// # Example
///
/// ```
/// use trueno_apsp::matrix::seed::reference_fixture;
///
/// let m = reference_fixture::<i32>();
/// assert_eq!(m.size(), 8);
/// assert_eq!(m.get(0, 2), Some(9));
/// ```
#[must_use]
pub fn reference_fixture<W: Weight>() -> WeightMatrix<W> {
    WeightMatrix::from_fn(FIXTURE_SIZE, |i, j| W::from_seed(REFERENCE_FIXTURE[i][j].unsigned_abs()))
}

/// Deterministic positive weights in `1..=100` with a zero diagonal
///
/// Same `seed` always gives the same matrix, so every substrate can be fed
/// identical input.
#[must_use]
pub fn random_positive<W: Weight>(n: usize, seed: u64) -> WeightMatrix<W> {
    let mut rng_state = seed;
    let mut matrix = WeightMatrix::zeroed(n);
    for (idx, cell) in matrix.as_mut_slice().iter_mut().enumerate() {
        if idx / n.max(1) == idx % n.max(1) {
            continue;
        }
        rng_state = rng_state.wrapping_mul(1_103_515_245).wrapping_add(12345);
        #[allow(clippy::cast_possible_truncation)]
        let draw = ((rng_state >> 16) % u64::from(MAX_RANDOM_WEIGHT)) as u32;
        *cell = W::from_seed(draw + 1);
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_is_symmetric_with_zero_diagonal() {
        let m = reference_fixture::<i32>();
        for i in 0..FIXTURE_SIZE {
            assert_eq!(m.get(i, i), Some(0));
            for j in 0..FIXTURE_SIZE {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
    }

    #[test]
    fn test_fixture_matches_literal() {
        let m = reference_fixture::<f32>();
        assert_eq!(m.size(), FIXTURE_SIZE);
        for (i, row) in REFERENCE_FIXTURE.iter().enumerate() {
            for (j, &w) in row.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let expected = w as f32;
                assert_eq!(m.get(i, j), Some(expected), "cell ({i}, {j})");
            }
        }
    }

    #[test]
    fn test_random_positive_is_deterministic() {
        let a = random_positive::<f32>(6, 7);
        let b = random_positive::<f32>(6, 7);
        assert_eq!(a, b);
        assert_ne!(a, random_positive::<f32>(6, 8));
    }

    #[test]
    fn test_random_positive_range() {
        let m = random_positive::<i32>(10, 1);
        for i in 0..10 {
            for j in 0..10 {
                let w = m.get(i, j).unwrap();
                if i == j {
                    assert_eq!(w, 0);
                } else {
                    assert!((1..=100).contains(&w), "weight {w} out of range");
                }
            }
        }
    }

    #[test]
    fn test_random_positive_empty() {
        let m = random_positive::<f64>(0, 3);
        assert_eq!(m.size(), 0);
    }
}
