//! Video frame types shared between the caller and the render thread.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Identity texture-coordinate transform (column-major 4x4).
pub const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Which physical camera sourced a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraFacing {
    Front,
    Back,
}

impl CameraFacing {
    pub fn is_front(self) -> bool {
        matches!(self, CameraFacing::Front)
    }
}

/// GPU texture flavor carried by a texture buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// Imported/opaque texture, e.g. straight from a camera decoder
    External,
    /// Standard 2D RGBA texture
    Rgba,
}

/// Pixel formats for CPU-resident buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8,
    Nv12,
}

/// Owned, cloneable handle to a GPU texture.
///
/// Clones share the same underlying texture. Moving a clone into the frame
/// hand-off transfers the right to read the texture to the render thread
/// until the hand-off call returns.
#[derive(Clone)]
pub struct TextureHandle {
    texture: Arc<wgpu::Texture>,
}

impl TextureHandle {
    pub fn new(texture: wgpu::Texture) -> Self {
        Self {
            texture: Arc::new(texture),
        }
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    pub fn view(&self) -> wgpu::TextureView {
        self.texture
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// True if both handles refer to the same underlying texture.
    pub fn same_texture(&self, other: &TextureHandle) -> bool {
        Arc::ptr_eq(&self.texture, &other.texture)
    }
}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureHandle({}x{})", self.width(), self.height())
    }
}

/// Texture-backed frame payload
#[derive(Debug, Clone)]
pub struct TextureBuffer {
    pub handle: TextureHandle,
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    /// Texture-coordinate transform supplied by the capture source
    pub transform: [f32; 16],
}

/// CPU-resident frame payload
#[derive(Debug, Clone)]
pub struct MemoryBuffer {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Frame payload: either GPU-resident or raw bytes
#[derive(Debug, Clone)]
pub enum FrameBuffer {
    Texture(TextureBuffer),
    Memory(MemoryBuffer),
}

impl FrameBuffer {
    pub fn width(&self) -> u32 {
        match self {
            FrameBuffer::Texture(t) => t.width,
            FrameBuffer::Memory(m) => m.width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            FrameBuffer::Texture(t) => t.height,
            FrameBuffer::Memory(m) => m.height,
        }
    }

    pub fn as_texture(&self) -> Option<&TextureBuffer> {
        match self {
            FrameBuffer::Texture(t) => Some(t),
            FrameBuffer::Memory(_) => None,
        }
    }
}

/// One live video frame.
///
/// The caller owns the frame for the duration of a pipeline invocation.
/// The pipeline may replace the payload but never touches rotation or
/// timestamp except through [`VideoFrame::replace_buffer`], which updates
/// them together.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    buffer: FrameBuffer,
    rotation: i32,
    timestamp_ns: i64,
    facing: CameraFacing,
}

impl VideoFrame {
    pub fn new(buffer: FrameBuffer, rotation: i32, timestamp_ns: i64, facing: CameraFacing) -> Self {
        Self {
            buffer,
            rotation,
            timestamp_ns,
            facing,
        }
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    /// Swap the payload, updating rotation and timestamp in the same step.
    pub fn replace_buffer(&mut self, buffer: FrameBuffer, rotation: i32, timestamp_ns: i64) {
        self.buffer = buffer;
        self.rotation = rotation;
        self.timestamp_ns = timestamp_ns;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_frame() -> VideoFrame {
        VideoFrame::new(
            FrameBuffer::Memory(MemoryBuffer {
                data: Bytes::from_static(&[0u8; 16]),
                width: 2,
                height: 2,
                format: PixelFormat::Rgba8,
            }),
            90,
            1_000,
            CameraFacing::Back,
        )
    }

    #[test]
    fn memory_buffer_is_not_texture_backed() {
        let frame = memory_frame();
        assert!(frame.buffer().as_texture().is_none());
        assert_eq!(frame.buffer().width(), 2);
        assert_eq!(frame.buffer().height(), 2);
    }

    #[test]
    fn replace_buffer_updates_rotation_and_timestamp_together() {
        let mut frame = memory_frame();
        let replacement = FrameBuffer::Memory(MemoryBuffer {
            data: Bytes::from_static(&[0u8; 64]),
            width: 4,
            height: 4,
            format: PixelFormat::Rgba8,
        });
        frame.replace_buffer(replacement, 270, 2_000);
        assert_eq!(frame.rotation(), 270);
        assert_eq!(frame.timestamp_ns(), 2_000);
        assert_eq!(frame.buffer().width(), 4);
        // Facing is identity, never replaced
        assert_eq!(frame.facing(), CameraFacing::Back);
    }

    #[test]
    fn facing_front_check() {
        assert!(CameraFacing::Front.is_front());
        assert!(!CameraFacing::Back.is_front());
    }
}
