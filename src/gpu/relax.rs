//! GPU Floyd–Warshall driver
//!
//! One single-workgroup dispatch per pivot. A single workgroup keeps
//! `storageBarrier()` a barrier across every lane taking part in the phase;
//! the host waits for each dispatch before issuing the next.

use super::{GpuDevice, GpuMatrixBuffers};
use crate::device::{DeviceRunReport, LaunchConfig};
use crate::matrix::WeightMatrix;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

const SHADER: &str = include_str!("shaders/relax.wgsl");

fn buffer_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Compiled relaxation pipeline bound to one set of matrix buffers
#[derive(Debug)]
pub struct RelaxKernel {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    lanes: usize,
}

impl RelaxKernel {
    /// Compile `relax_pivot` for `config.lanes` lanes and bind `buffers`
    ///
    /// # Errors
    ///
    /// Returns error for zero lanes or more lanes than one workgroup holds
    pub fn new(
        device: &GpuDevice,
        buffers: &GpuMatrixBuffers,
        config: &LaunchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let max_lanes = device.max_lanes();
        anyhow::ensure!(
            config.lanes <= max_lanes,
            "{} lanes exceed the device workgroup limit of {max_lanes}",
            config.lanes
        );

        let shader_module = device
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("APSP Relax Shader"),
                source: wgpu::ShaderSource::Wgsl(SHADER.into()),
            });

        let storage = wgpu::BufferBindingType::Storage { read_only: false };
        let bind_group_layout =
            device
                .device()
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("APSP Bind Group Layout"),
                    entries: &[
                        // @binding(0): uniform params
                        buffer_entry(0, wgpu::BufferBindingType::Uniform),
                        // @binding(1): dist
                        buffer_entry(1, storage),
                        // @binding(2): column_k
                        buffer_entry(2, storage),
                        // @binding(3): row_k
                        buffer_entry(3, storage),
                    ],
                });

        let pipeline_layout = device
            .device()
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("APSP Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        #[allow(clippy::cast_precision_loss)]
        let constants = HashMap::from([("LANES".to_string(), config.lanes as f64)]);
        let pipeline = device
            .device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("APSP Relax Pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: "relax_pivot",
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
                cache: None,
            });

        let bind_group = device
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("APSP Bind Group"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffers.params.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: buffers.dist.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffers.column_k.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: buffers.row_k.as_entire_binding(),
                    },
                ],
            });

        Ok(Self {
            pipeline,
            bind_group,
            lanes: config.lanes,
        })
    }

    /// Lanes per dispatch
    #[must_use]
    pub const fn lanes(&self) -> usize {
        self.lanes
    }

    /// Dispatch the phase for pivot `k` and wait for it to complete
    pub fn launch(&self, device: &GpuDevice, buffers: &GpuMatrixBuffers, k: usize) {
        buffers.write_pivot(device, k);

        let mut encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("APSP Relax Encoder"),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("APSP Relax Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &self.bind_group, &[]);
            compute_pass.dispatch_workgroups(1, 1, 1);
        }
        device.queue().submit(Some(encoder.finish()));
        device.synchronize();
    }
}

/// Run Floyd–Warshall on the GPU, replacing `host` with the relaxed matrix
///
/// # Errors
///
/// Returns error if:
/// - the launch shape is invalid for this device
/// - buffer upload or readback fails
///
/// # Example
///
/// ```ignore
/// # use trueno_apsp::gpu::{GpuDevice, gpu_floyd_warshall};
/// # use trueno_apsp::device::LaunchConfig;
/// # use trueno_apsp::reference_fixture;
/// # async fn example() -> anyhow::Result<()> {
/// let device = GpuDevice::new().await?;
/// let mut matrix = reference_fixture::<f32>();
/// let report = gpu_floyd_warshall(&device, &mut matrix, &LaunchConfig::default()).await?;
/// assert_eq!(report.launches, 8);
/// # Ok(())
/// # }
/// ```
pub async fn gpu_floyd_warshall(
    device: &GpuDevice,
    host: &mut WeightMatrix<f32>,
    config: &LaunchConfig,
) -> Result<DeviceRunReport> {
    let n = host.size();
    config.validate()?;
    let started = Instant::now();
    if n == 0 {
        return Ok(DeviceRunReport {
            launches: 0,
            lanes: config.lanes,
            elapsed: started.elapsed(),
        });
    }

    info!(n, lanes = config.lanes, adapter = %device.info().name, "starting GPU run");
    let buffers = GpuMatrixBuffers::from_matrix(device, host)?;
    let kernel = RelaxKernel::new(device, &buffers, config)?;

    for k in 0..n {
        kernel.launch(device, &buffers, k);
        debug!(k, "pivot relaxed");
    }

    *host = buffers
        .read_matrix(device)
        .await
        .context("failed to read relaxed matrix")?;

    let elapsed = started.elapsed();
    info!(n, ?elapsed, "GPU run complete");
    Ok(DeviceRunReport {
        launches: n,
        lanes: kernel.lanes(),
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::floyd_warshall;
    use crate::matrix::{random_positive, reference_fixture};
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_gpu_fixture() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_fixture: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let seed = reference_fixture::<f32>();
        let mut m = seed.clone();
        let report = gpu_floyd_warshall(&device, &mut m, &LaunchConfig::default())
            .await
            .unwrap();

        assert_eq!(report.launches, 8);
        assert_eq!(m, floyd_warshall(&seed));
    }

    #[tokio::test]
    #[serial]
    async fn test_gpu_lanes_fewer_than_rows() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_lanes_fewer_than_rows: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let seed = random_positive::<f32>(33, 5);
        let mut m = seed.clone();
        gpu_floyd_warshall(&device, &mut m, &LaunchConfig::with_lanes(4))
            .await
            .unwrap();
        assert_eq!(m, floyd_warshall(&seed));
    }

    #[tokio::test]
    #[serial]
    async fn test_gpu_rejects_oversized_workgroup() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_rejects_oversized_workgroup: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let mut m = reference_fixture::<f32>();
        let config = LaunchConfig::with_lanes(device.max_lanes() + 1);
        assert!(gpu_floyd_warshall(&device, &mut m, &config).await.is_err());
        assert_eq!(m, reference_fixture::<f32>());
    }
}
