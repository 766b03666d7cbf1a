//! WebGPU rendering context bound to a dedicated thread.
//!
//! The device, queue and blitter live on one named thread; everything else
//! reaches them through [`RenderContext::invoke`] / [`RenderContext::post`].
//! "Exactly one thread touches this GPU context" is an invariant here, not
//! an optimization.

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;
use wgpu::*;

use crate::error::PipelineError;
use crate::frame::TextureHandle;
use crate::gpu::blit::RectBlitter;
use crate::gpu::executor::RenderThread;
use crate::gpu::TEXTURE_FORMAT;
use crate::{GpuBackend, GpuConfig, PowerClass};

/// Borrowed device/queue pair handed to transform strategies.
#[derive(Clone, Copy)]
pub struct GpuHandle<'a> {
    pub device: &'a Device,
    pub queue: &'a Queue,
}

impl GpuHandle<'_> {
    /// Create a sampled + renderable RGBA texture.
    pub fn create_texture(&self, label: &str, width: u32, height: u32) -> TextureHandle {
        let texture = self.device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING
                | TextureUsages::COPY_DST
                | TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        TextureHandle::new(texture)
    }
}

/// GPU device state owned by the render thread
pub struct GpuState {
    device: Device,
    queue: Queue,
    blitter: RectBlitter,
}

impl GpuState {
    async fn init(config: GpuConfig) -> Result<Self, PipelineError> {
        let instance = Instance::new(InstanceDescriptor {
            backends: backend_mask(config.backend),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: power_preference(config.power),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(PipelineError::NoAdapter)?;

        info!("GPU: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("preen device"),
                    required_features: Features::empty(),
                    required_limits: Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let blitter = RectBlitter::new(&device);

        Ok(Self {
            device,
            queue,
            blitter,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn blitter(&self) -> &RectBlitter {
        &self.blitter
    }

    pub fn handle(&self) -> GpuHandle<'_> {
        GpuHandle {
            device: &self.device,
            queue: &self.queue,
        }
    }

    /// Create a sampled + renderable RGBA texture.
    pub fn create_texture(&self, label: &str, width: u32, height: u32) -> TextureHandle {
        self.handle().create_texture(label, width, height)
    }

    /// Upload tightly packed RGBA pixels into `texture`.
    pub fn upload_rgba(&self, texture: &TextureHandle, data: &[u8]) {
        self.queue.write_texture(
            ImageCopyTexture {
                texture: texture.raw(),
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            data,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * texture.width()),
                rows_per_image: Some(texture.height()),
            },
            Extent3d {
                width: texture.width(),
                height: texture.height(),
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::empty());
    }
}

/// Handle to the rendering-context thread.
pub struct RenderContext {
    thread: RenderThread<GpuState>,
}

impl RenderContext {
    /// Spawn the render thread and initialize the GPU on it.
    pub fn new(config: &GpuConfig) -> Result<Arc<Self>, PipelineError> {
        let config = config.clone();
        let thread = RenderThread::spawn("preen-render", move || {
            pollster::block_on(GpuState::init(config))
        })?;
        Ok(Arc::new(Self { thread }))
    }

    /// Run `f` on the render thread and block until it returns.
    pub fn invoke<R, F>(&self, f: F) -> Result<R, PipelineError>
    where
        R: Send + 'static,
        F: FnOnce(&mut GpuState) -> R + Send + 'static,
    {
        self.thread.invoke(f)
    }

    /// Queue `f` on the render thread without waiting.
    pub fn post<F>(&self, f: F) -> Result<(), PipelineError>
    where
        F: FnOnce(&mut GpuState) + Send + 'static,
    {
        self.thread.post(f)
    }

    /// Create a texture the caller can upload into and hand off.
    pub fn create_source_texture(
        &self,
        width: u32,
        height: u32,
    ) -> Result<TextureHandle, PipelineError> {
        self.invoke(move |gpu| gpu.create_texture("source texture", width, height))
    }

    /// Upload tightly packed RGBA pixels into `texture` from any thread.
    pub fn upload_rgba(&self, texture: &TextureHandle, data: Bytes) -> Result<(), PipelineError> {
        let texture = texture.clone();
        self.invoke(move |gpu| gpu.upload_rgba(&texture, &data))
    }
}

fn backend_mask(backend: GpuBackend) -> Backends {
    match backend {
        GpuBackend::Vulkan => Backends::VULKAN,
        GpuBackend::Metal => Backends::METAL,
        GpuBackend::Dx12 => Backends::DX12,
        GpuBackend::OpenGl => Backends::GL,
        GpuBackend::Auto => Backends::all(),
    }
}

fn power_preference(power: PowerClass) -> PowerPreference {
    match power {
        PowerClass::Auto => PowerPreference::None,
        PowerClass::HighPerformance => PowerPreference::HighPerformance,
        PowerClass::LowPower => PowerPreference::LowPower,
    }
}
