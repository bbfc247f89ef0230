//! Accelerator substrate, emulated on CPU lanes
//!
//! Same launch discipline as the wgpu backend in `gpu`: one kernel launch
//! per pivot, two staging vectors filled by strided lanes, a barrier between
//! staging and consumption, and a full host wait between launches. Runs
//! everywhere, so the accelerator contract is testable without a GPU.

mod kernel;
mod memory;

pub use kernel::{
    emulated_floyd_warshall, launch_relaxation, DeviceError, DeviceRunReport, LaunchConfig,
    DEFAULT_LANES,
};
pub use memory::{with_device_matrix, DeviceMatrix, DeviceScalar, StagingBuffers};
