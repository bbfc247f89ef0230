//! Sequential shortest-path relaxation
//!
//! The reference every other substrate is checked against.

pub mod floyd_warshall;

pub use floyd_warshall::{
    floyd_warshall, floyd_warshall_in_place, relax_band, relax_pivot, relaxation_history,
};
