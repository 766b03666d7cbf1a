//! Error taxonomy for the pipeline and its GPU plumbing.

use thiserror::Error;

/// Failures surfaced by the pipeline and the render context.
///
/// None of these cross the asynchronous boundary: the controller degrades
/// every failure to "no update this frame" and logs it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline has been released")]
    Released,

    #[error("render context is no longer running")]
    ContextClosed,

    #[error("frame buffer is not texture-backed")]
    NotTextureBacked,

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to acquire GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("frame transform failed: {0}")]
    Transform(String),
}
