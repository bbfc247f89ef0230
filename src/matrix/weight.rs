//! Edge weight scalars
//!
//! Relaxation only needs three things from a weight: a total-enough order,
//! a path sum, and a value meaning "no edge". Integers saturate at `MAX` so
//! unreachable plus anything stays unreachable; floats get the same for free
//! from IEEE infinity.

use std::fmt;

/// Scalar stored in a [`WeightMatrix`](super::WeightMatrix)
pub trait Weight: Copy + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Distance from a vertex to itself
    const ZERO: Self;

    /// Distance between vertices with no connecting path
    const UNREACHABLE: Self;

    /// Length of the path `self` followed by `other`
    #[must_use]
    fn path_sum(self, other: Self) -> Self;

    /// Smaller of two weights, keeping `self` on ties and on unordered input
    #[must_use]
    fn min_weight(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    /// Build a weight from a small non-negative seed value
    fn from_seed(value: u32) -> Self;

    /// Widen to `f64` for tolerance comparisons
    fn to_f64(self) -> f64;
}

macro_rules! impl_integer_weight {
    ($($t:ty),*) => {
        $(
            impl Weight for $t {
                const ZERO: Self = 0;
                const UNREACHABLE: Self = <$t>::MAX;

                fn path_sum(self, other: Self) -> Self {
                    self.saturating_add(other)
                }

                fn from_seed(value: u32) -> Self {
                    Self::try_from(value).unwrap_or(Self::MAX)
                }

                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

macro_rules! impl_float_weight {
    ($($t:ty),*) => {
        $(
            impl Weight for $t {
                const ZERO: Self = 0.0;
                const UNREACHABLE: Self = <$t>::INFINITY;

                fn path_sum(self, other: Self) -> Self {
                    self + other
                }

                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn from_seed(value: u32) -> Self {
                    value as $t
                }

                #[allow(clippy::cast_lossless)]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_integer_weight!(i32, i64);
impl_float_weight!(f32, f64);
