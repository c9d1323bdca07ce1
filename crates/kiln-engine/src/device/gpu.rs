use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use super::{GpuError, GpuInit};

/// Owns the wgpu adapter, device and queue.
///
/// There is no surface: frames render into off-screen framebuffers. Every
/// method that records or submits GPU work is meant to be called from tasks
/// pinned to the GPU thread.
pub struct Gpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    lost: Arc<Mutex<Option<String>>>,
}

impl Gpu {
    /// Creates a device without a presentation surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn headless(init: GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(&init.label),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let lost = Arc::new(Mutex::new(None));
        {
            let lost = lost.clone();
            device.set_device_lost_callback(move |reason, message| {
                match reason {
                    wgpu::DeviceLostReason::Destroyed => log::debug!("device destroyed"),
                    wgpu::DeviceLostReason::Unknown => log::error!("device lost: {message}"),
                }
                *lost.lock() = Some(format!("{reason:?}: {message}"));
            });
        }

        let info = adapter.get_info();
        log::info!(
            "using adapter `{}` ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        Ok(Self {
            adapter,
            device,
            queue,
            color_format: init.color_format(),
            lost,
        })
    }

    /// Blocks the calling thread on [`Gpu::headless`].
    pub fn headless_blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::headless(init))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Why the device was lost, once it has been.
    pub fn lost_reason(&self) -> Option<String> {
        self.lost.lock().clone()
    }

    /// Runs `f` inside out-of-memory, validation and internal error scopes.
    ///
    /// Anything wgpu captured, or a lost device, comes back as a [`GpuError`]
    /// carrying the matching codes instead of reaching the uncaptured-error
    /// handler. Scopes are per thread, so `f` must not hand GPU work to
    /// another thread.
    pub fn scoped<R>(&self, context: &str, f: impl FnOnce() -> R) -> Result<R, GpuError> {
        let oom = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let internal = self.device.push_error_scope(wgpu::ErrorFilter::Internal);

        let value = f();

        // Innermost first.
        let captured: Vec<wgpu::Error> = [internal, validation, oom]
            .into_iter()
            .filter_map(|scope| pollster::block_on(scope.pop()))
            .collect();

        match GpuError::from_captured(context, captured, self.lost_reason().as_deref()) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}
