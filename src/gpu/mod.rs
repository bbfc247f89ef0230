//! GPU backend for the accelerator substrate
//!
//! Runs the same per-pivot launch discipline as [`crate::device`] through a
//! WGSL compute shader. Only `f32` weights are supported on the GPU.
//!
//! # Architecture
//!
//! - `device`: GPU device initialization and management
//! - `buffer`: matrix, staging and parameter buffers
//! - `relax`: the `relax_pivot` pipeline and the host dispatch loop
//!
//! # Feature Flag
//!
//! This module is only available with the `gpu` feature flag:
//! ```bash
//! cargo build --features gpu
//! ```

mod buffer;
mod device;
mod relax;

pub use buffer::{GpuMatrixBuffers, RelaxParams};
pub use device::{GpuDevice, GpuDeviceError};
pub use relax::{gpu_floyd_warshall, RelaxKernel};
