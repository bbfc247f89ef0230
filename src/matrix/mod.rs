//! Weight matrix storage
//!
//! The dense n×n grid relaxed by every substrate, plus its scalar type and
//! the seeds a run starts from.

pub mod dense;
pub mod seed;
pub mod weight;

pub use dense::{MatrixError, WeightMatrix};
pub use seed::{random_positive, reference_fixture};
pub use weight::Weight;
