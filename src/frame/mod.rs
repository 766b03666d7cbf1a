pub mod video;

pub use video::{
    CameraFacing, FrameBuffer, MemoryBuffer, PixelFormat, TextureBuffer, TextureHandle,
    TextureKind, VideoFrame, IDENTITY_MATRIX,
};
