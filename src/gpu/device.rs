//! GPU device initialization and management
//!
//! Adapter selection, device/queue lifetime, buffer creation and host/device
//! synchronization for the relaxation kernel.

use thiserror::Error;
use wgpu::util::DeviceExt;

/// GPU device initialization errors
#[derive(Debug, Error)]
pub enum GpuDeviceError {
    /// No compatible GPU adapter found
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device
    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(String),

    /// Readback buffer could not be mapped
    #[error("Failed to map GPU buffer: {0}")]
    BufferMap(String),
}

/// GPU device wrapper for the relaxation kernel
///
/// # Example
///
/// ```ignore
/// # use trueno_apsp::gpu::GpuDevice;
/// let device = GpuDevice::new().await?;
/// println!("running on {}", device.info().name);
/// ```
#[derive(Debug)]
pub struct GpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter: wgpu::Adapter,
}

impl GpuDevice {
    /// Check if GPU is available without keeping a device
    ///
    /// Tests use this to skip gracefully on machines without a GPU.
    pub async fn is_gpu_available() -> bool {
        Self::new().await.is_ok()
    }

    /// Initialize GPU device with default settings
    ///
    /// # Errors
    ///
    /// Returns `GpuDeviceError` if no adapter is found or the device request fails
    pub async fn new() -> Result<Self, GpuDeviceError> {
        Self::new_with_backend(wgpu::Backends::all()).await
    }

    /// Initialize GPU device with specific backend
    ///
    /// # Errors
    ///
    /// Returns `GpuDeviceError` if device initialization fails
    pub async fn new_with_backend(backends: wgpu::Backends) -> Result<Self, GpuDeviceError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuDeviceError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("trueno-apsp GPU device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| GpuDeviceError::DeviceRequest(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }

    /// Get adapter info (GPU name, backend, etc.)
    #[must_use]
    pub fn info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Largest single-workgroup lane count the device accepts
    #[must_use]
    pub fn max_lanes(&self) -> usize {
        let limits = self.device.limits();
        limits
            .max_compute_workgroup_size_x
            .min(limits.max_compute_invocations_per_workgroup) as usize
    }

    /// Create GPU buffer with initial data
    #[must_use]
    pub fn create_buffer_init(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
    }

    /// Create empty GPU buffer
    #[must_use]
    pub fn create_buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    /// Block until all submitted work has finished
    pub fn synchronize(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// Get device reference
    #[must_use]
    pub const fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get queue reference
    #[must_use]
    pub const fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_gpu_device_creation() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_device_creation: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        assert!(!device.info().name.is_empty());
        assert!(device.max_lanes() >= 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_gpu_device_with_invalid_backend() {
        let device = GpuDevice::new_with_backend(wgpu::Backends::empty()).await;
        assert!(
            device.is_err(),
            "Device creation should fail with empty backends"
        );
    }

    #[test]
    fn test_gpu_device_error_display() {
        let err = GpuDeviceError::NoAdapter;
        assert_eq!(err.to_string(), "No compatible GPU adapter found");

        let err = GpuDeviceError::BufferMap("lost".to_string());
        assert_eq!(err.to_string(), "Failed to map GPU buffer: lost");
    }

    #[tokio::test]
    #[serial]
    async fn test_create_buffers() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_create_buffers: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let data: Vec<f32> = vec![0.0, 1.0, 2.0, 3.0];
        let init = device.create_buffer_init(
            "test_init",
            bytemuck::cast_slice(&data),
            wgpu::BufferUsages::STORAGE,
        );
        assert_eq!(init.size(), 16);

        let empty = device.create_buffer(
            "test_empty",
            256,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        );
        assert_eq!(empty.size(), 256);
        device.synchronize();
    }
}
