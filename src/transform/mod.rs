//! Per-frame GPU transform strategies.

pub mod color_adjust;
pub mod passthrough;

pub use color_adjust::{ColorAdjustParams, ColorAdjustTransform};
pub use passthrough::Passthrough;

use crate::error::PipelineError;
use crate::frame::TextureHandle;
use crate::gpu::GpuHandle;
use crate::pipeline::AsyncFrameDescriptor;

/// Per-frame GPU transform applied on the render thread.
///
/// Implementations run synchronously inside the consumer callback and must
/// not retain the input texture beyond the call. The returned handle may be
/// the input itself or a texture the strategy owns; the pipeline copies it
/// into the output store before the next frame arrives.
pub trait FrameTransform: Send {
    fn transform(
        &mut self,
        gpu: &GpuHandle<'_>,
        frame: &AsyncFrameDescriptor,
    ) -> Result<TextureHandle, PipelineError>;
}
