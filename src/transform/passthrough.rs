//! No-op transform, useful for latency measurement and tests.

use crate::error::PipelineError;
use crate::frame::TextureHandle;
use crate::gpu::GpuHandle;
use crate::pipeline::AsyncFrameDescriptor;

use super::FrameTransform;

/// Returns the source texture untouched.
#[derive(Debug, Default)]
pub struct Passthrough;

impl FrameTransform for Passthrough {
    fn transform(
        &mut self,
        _gpu: &GpuHandle<'_>,
        frame: &AsyncFrameDescriptor,
    ) -> Result<TextureHandle, PipelineError> {
        Ok(frame.texture.clone())
    }
}
