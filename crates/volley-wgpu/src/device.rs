use std::sync::Arc;

use anyhow::{Context, Result};

/// Initialization parameters for the wgpu backend.
#[derive(Debug, Clone)]
pub struct WgpuInit {
    pub power_preference: wgpu::PowerPreference,

    /// Use a software adapter when available.
    pub force_fallback_adapter: bool,

    /// Required wgpu features. `POLYGON_MODE_LINE` enables wireframe pipelines.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Offscreen target size in pixels.
    pub target_size: (u32, u32),

    pub color_format: wgpu::TextureFormat,

    /// `None` renders without a depth/stencil attachment; pipelines that
    /// enable depth or stencil testing then fail to create.
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            target_size: (800, 600),
            color_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            depth_format: Some(wgpu::TextureFormat::Depth24PlusStencil8),
        }
    }
}

/// Adapter, device and queue of a headless wgpu context.
pub struct Gpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl Gpu {
    /// Acquires an adapter and device without a surface.
    pub async fn new(init: &WgpuInit) -> Result<Self> {
        let (width, height) = init.target_size;
        anyhow::ensure!(width > 0 && height > 0, "offscreen target has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
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
                label: Some("volley device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        // Errors outside a validation scope are logged instead of panicking.
        device.on_uncaptured_error(Arc::new(|error: wgpu::Error| {
            log::error!("uncaptured wgpu error: {error}");
        }));

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// Runs `f` inside a validation error scope on `device`.
///
/// Object creation that fails validation still returns a (poisoned) wgpu
/// object; callers must drop it when this returns `Err`.
pub(crate) fn validated<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(scope.pop()) {
        Some(error) => Err(error),
        None => Ok(value),
    }
}
