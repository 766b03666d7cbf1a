pub mod blit;
pub mod context;
pub mod executor;
pub mod target;

pub use blit::RectBlitter;
pub use context::{GpuHandle, GpuState, RenderContext};
pub use executor::RenderThread;
pub use target::RenderTarget;

/// Texture format used for every texture the pipeline allocates
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
