//! GPU buffer management for the weight matrix
//!
//! Handles uploading the row-major matrix, the two pivot staging vectors and
//! the launch parameters, and downloading the relaxed matrix.

use super::{GpuDevice, GpuDeviceError};
use crate::matrix::WeightMatrix;
use anyhow::{Context, Result};

/// Uniform block read by `relax_pivot`
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RelaxParams {
    /// Matrix dimension
    pub n: u32,
    /// Current pivot
    pub k: u32,
    _pad0: u32,
    _pad1: u32,
}

impl RelaxParams {
    /// Parameters for pivot `k` of an n×n matrix
    #[must_use]
    pub const fn new(n: u32, k: u32) -> Self {
        Self {
            n,
            k,
            _pad0: 0,
            _pad1: 0,
        }
    }
}

/// GPU buffers for one matrix run
///
/// Manages GPU-side storage of:
/// - The n×n distance matrix (row-major `f32`)
/// - Column `k` and row `k` staging vectors
/// - The launch parameters uniform
#[derive(Debug)]
pub struct GpuMatrixBuffers {
    n: usize,

    /// Distance matrix (size: n²)
    pub dist: wgpu::Buffer,

    /// Staged column `k` (size: n)
    pub column_k: wgpu::Buffer,

    /// Staged row `k` (size: n)
    pub row_k: wgpu::Buffer,

    /// Launch parameters
    pub params: wgpu::Buffer,
}

#[allow(clippy::cast_possible_truncation)]
fn byte_len(elements: usize) -> u64 {
    (elements * std::mem::size_of::<f32>()) as u64
}

impl GpuMatrixBuffers {
    /// Upload `matrix` to the GPU
    ///
    /// # Errors
    ///
    /// Returns error for an empty matrix or one too large for 32-bit indexing
    pub fn from_matrix(device: &GpuDevice, matrix: &WeightMatrix<f32>) -> Result<Self> {
        let n = matrix.size();
        anyhow::ensure!(n > 0, "cannot upload an empty matrix");
        let n_u32 = u32::try_from(n).context("matrix too large for GPU indexing")?;
        u32::try_from(n * n).context("matrix too large for GPU indexing")?;

        let dist = device.create_buffer_init(
            "APSP distances",
            bytemuck::cast_slice(matrix.as_slice()),
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );
        let column_k = device.create_buffer(
            "APSP column_k",
            byte_len(n),
            wgpu::BufferUsages::STORAGE,
        );
        let row_k = device.create_buffer("APSP row_k", byte_len(n), wgpu::BufferUsages::STORAGE);
        let params = device.create_buffer_init(
            "APSP params",
            bytemuck::bytes_of(&RelaxParams::new(n_u32, 0)),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );

        Ok(Self {
            n,
            dist,
            column_k,
            row_k,
            params,
        })
    }

    /// Matrix dimension
    #[must_use]
    pub const fn size(&self) -> usize {
        self.n
    }

    /// Queue a parameter update for pivot `k`
    #[allow(clippy::cast_possible_truncation)]
    pub fn write_pivot(&self, device: &GpuDevice, k: usize) {
        let params = RelaxParams::new(self.n as u32, k as u32);
        device
            .queue()
            .write_buffer(&self.params, 0, bytemuck::bytes_of(&params));
    }

    /// Download the distance matrix
    ///
    /// # Errors
    ///
    /// Returns error if the readback buffer cannot be mapped
    pub async fn read_matrix(&self, device: &GpuDevice) -> Result<WeightMatrix<f32>> {
        let size = byte_len(self.n * self.n);
        let staging_buffer = device.create_buffer(
            "APSP readback",
            size,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        );

        let mut encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        encoder.copy_buffer_to_buffer(&self.dist, 0, &staging_buffer, 0, size);
        device.queue().submit(Some(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();

        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        device.synchronize();
        rx.receive()
            .await
            .ok_or_else(|| GpuDeviceError::BufferMap("map callback dropped".to_string()))?
            .map_err(|e| GpuDeviceError::BufferMap(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let cells: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging_buffer.unmap();

        Ok(WeightMatrix::from_row_major(self.n, cells)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::reference_fixture;
    use serial_test::serial;

    #[test]
    fn test_params_layout() {
        assert_eq!(std::mem::size_of::<RelaxParams>(), 16);
        let p = RelaxParams::new(8, 3);
        assert_eq!(bytemuck::cast::<_, [u32; 4]>(p), [8, 3, 0, 0]);
    }

    #[tokio::test]
    #[serial]
    async fn test_upload_download_roundtrip() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_upload_download_roundtrip: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let matrix = reference_fixture::<f32>();
        let buffers = GpuMatrixBuffers::from_matrix(&device, &matrix).unwrap();
        assert_eq!(buffers.size(), 8);
        assert_eq!(buffers.read_matrix(&device).await.unwrap(), matrix);
    }

    #[tokio::test]
    #[serial]
    async fn test_empty_matrix_rejected() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_empty_matrix_rejected: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let empty: WeightMatrix<f32> = WeightMatrix::new(0);
        assert!(GpuMatrixBuffers::from_matrix(&device, &empty).is_err());
    }
}
