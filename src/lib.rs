pub mod error;
pub mod frame;
pub mod gpu;
pub mod pipeline;
pub mod source;
pub mod transform;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

pub use error::PipelineError;
pub use frame::{
    CameraFacing, FrameBuffer, MemoryBuffer, PixelFormat, TextureBuffer, TextureHandle,
    TextureKind, VideoFrame,
};
pub use gpu::RenderContext;
pub use pipeline::{EffectPipeline, PipelineStats};
pub use transform::FrameTransform;

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gpu: GpuConfig,
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuConfig {
    pub backend: GpuBackend,
    pub power: PowerClass,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum GpuBackend {
    Vulkan,
    Metal,
    Dx12,
    OpenGl,
    Auto,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum PowerClass {
    Auto,
    HighPerformance,
    LowPower,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Frames dropped after a camera switch so stale results drain out
    pub switch_skip_frames: u32,
    /// Hand-off pool depth; one slot is enough, two avoids reallocation
    /// churn when frame sizes alternate
    pub handoff_slots: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Demo only: flip camera facing every this many frames (0 = never)
    pub facing_flip_frames: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gpu: GpuConfig {
                backend: GpuBackend::Auto,
                power: PowerClass::HighPerformance,
            },
            pipeline: PipelineConfig {
                switch_skip_frames: 2,
                handoff_slots: 2,
            },
            source: SourceConfig {
                width: 1280,
                height: 720,
                fps: 30,
                facing_flip_frames: 150,
            },
        }
    }
}

impl Default for GpuConfig {
    fn default() -> Self {
        Config::default().gpu
    }
}
