//! Synthetic frame source: animated RGBA test pattern uploaded straight to
//! GPU textures. Stands in for a live camera in demos and tests.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::error::PipelineError;
use crate::frame::{
    CameraFacing, FrameBuffer, TextureBuffer, TextureHandle, TextureKind, VideoFrame,
    IDENTITY_MATRIX,
};
use crate::gpu::RenderContext;
use crate::SourceConfig;

/// Generates texture-backed frames with a moving gradient.
///
/// Two pool textures rotate: a texture is refilled only after the hand-off
/// for its previous frame has returned, at which point the pipeline no
/// longer reads it.
pub struct TestPatternSource {
    ctx: Arc<RenderContext>,
    config: SourceConfig,
    pool: Vec<TextureHandle>,
    next: usize,
    sequence: u64,
    epoch: Instant,
}

impl TestPatternSource {
    pub fn new(ctx: Arc<RenderContext>, config: SourceConfig) -> Result<Self, PipelineError> {
        let pool = (0..2)
            .map(|_| ctx.create_source_texture(config.width, config.height))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            ctx,
            config,
            pool,
            next: 0,
            sequence: 0,
            epoch: Instant::now(),
        })
    }

    /// Produce the next frame, stamped with `facing`.
    pub fn next_frame(&mut self, facing: CameraFacing) -> Result<VideoFrame, PipelineError> {
        let texture = self.pool[self.next].clone();
        self.next = (self.next + 1) % self.pool.len();

        let data = self.fill(self.sequence);
        self.ctx.upload_rgba(&texture, data)?;
        self.sequence += 1;

        let timestamp_ns = self.epoch.elapsed().as_nanos() as i64;
        Ok(VideoFrame::new(
            FrameBuffer::Texture(TextureBuffer {
                handle: texture,
                kind: TextureKind::Rgba,
                width: self.config.width,
                height: self.config.height,
                transform: IDENTITY_MATRIX,
            }),
            0,
            timestamp_ns,
            facing,
        ))
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn fill(&self, tick: u64) -> Bytes {
        let (width, height) = (self.config.width as usize, self.config.height as usize);
        let phase = (tick % 256) as usize;
        let mut data = vec![0u8; width * height * 4];

        for y in 0..height {
            for x in 0..width {
                let i = (y * width + x) * 4;
                data[i] = ((x * 255 / width.max(1) + phase) % 256) as u8;
                data[i + 1] = (y * 255 / height.max(1)) as u8;
                data[i + 2] = phase as u8;
                data[i + 3] = 255;
            }
        }

        Bytes::from(data)
    }
}
