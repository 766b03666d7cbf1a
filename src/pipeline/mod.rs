//! Asynchronous beautification pipeline.
//!
//! Decouples the thread delivering live frames from the render thread that
//! applies the per-frame transform. Each invocation hands its frame off
//! synchronously, then publishes the most recently *finished* result, so a
//! processed frame becomes visible at least one invocation after it was
//! submitted. Overload and camera switches degrade to dropped frames,
//! never to blocking or corrupted state.

pub mod consumer;
pub mod handoff;
pub mod store;

pub use consumer::FrameConsumer;
pub use handoff::{AsyncFrameDescriptor, FrameProducer};
pub use store::OutputStore;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::frame::{FrameBuffer, TextureBuffer, TextureKind, VideoFrame, IDENTITY_MATRIX};
use crate::gpu::{GpuState, RenderContext, RenderTarget, TEXTURE_FORMAT};
use crate::transform::FrameTransform;
use crate::CONFIG;

/// Facing/skip state machine: after a camera switch the next frames are
/// dropped so stale in-flight results drain out before publication resumes.
struct SwitchGuard {
    front_facing: bool,
    skip_frames: u32,
}

impl SwitchGuard {
    fn new(front_facing: bool) -> Self {
        Self {
            front_facing,
            skip_frames: 0,
        }
    }

    /// Observe one frame's facing. Returns true when the frame must not be
    /// published. Decrements at most one unit of skip state per call.
    fn observe(&mut self, front_facing: bool, switch_skip: u32) -> bool {
        if front_facing != self.front_facing {
            self.front_facing = front_facing;
            self.skip_frames = switch_skip;
            return true;
        }
        if self.skip_frames > 0 {
            self.skip_frames -= 1;
            return true;
        }
        false
    }
}

/// State shared with the render-thread consumer callback.
struct SharedState {
    released: AtomicBool,
    front_facing: AtomicBool,
    stale_drops: AtomicU64,
}

/// Counters snapshot for the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    pub frames_pushed: u64,
    pub frames_consumed: u64,
    pub frames_overwritten: u64,
    pub stale_drops: u64,
    pub frames_published: u64,
}

/// The per-frame entry point of the pipeline.
///
/// Owned by the capture thread; the render context is shared but all GPU
/// work is marshaled onto its thread. The pipeline never owns the context.
pub struct EffectPipeline {
    ctx: Arc<RenderContext>,
    producer: Arc<FrameProducer>,
    consumer: FrameConsumer,
    shared: Arc<SharedState>,
    store: Arc<OutputStore>,
    guard: SwitchGuard,
    switch_skip: u32,
    published: u64,
}

impl EffectPipeline {
    /// Build a pipeline around an existing render context and a transform
    /// strategy.
    pub fn new(ctx: Arc<RenderContext>, transform: Box<dyn FrameTransform>) -> Self {
        let config = CONFIG.load();

        let shared = Arc::new(SharedState {
            released: AtomicBool::new(false),
            front_facing: AtomicBool::new(false),
            stale_drops: AtomicU64::new(0),
        });
        let store = Arc::new(OutputStore::new());
        let producer = Arc::new(FrameProducer::new(
            Arc::clone(&ctx),
            config.pipeline.handoff_slots,
        ));

        let consumer = {
            let shared = Arc::clone(&shared);
            let store = Arc::clone(&store);
            let transform = Mutex::new(transform);
            FrameConsumer::new(
                Arc::clone(&ctx),
                Arc::new(move |gpu: &mut GpuState, descriptor: AsyncFrameDescriptor| {
                    consume_frame(gpu, descriptor, &shared, &store, &transform);
                }),
            )
        };

        Self {
            ctx,
            producer,
            consumer,
            shared,
            store,
            guard: SwitchGuard::new(false),
            switch_skip: config.pipeline.switch_skip_frames,
            published: 0,
        }
    }

    /// Feed one live frame. Returns true iff the frame's buffer was
    /// replaced with a newly published result.
    ///
    /// Blocks only for the hand-off acceptance, never for GPU processing;
    /// the result published here is always from an earlier invocation.
    pub fn process(&mut self, frame: &mut VideoFrame) -> bool {
        if self.shared.released.load(Ordering::Acquire) {
            warn!("process called after release");
            return false;
        }

        let Some(texture) = frame.buffer().as_texture().cloned() else {
            error!("frame buffer is not texture-backed");
            return false;
        };
        let (width, height) = (texture.width, texture.height);
        let front_facing = frame.facing().is_front();

        // Synchronous hand-off: returns once the render thread holds a copy
        let started = Instant::now();
        let index = match self.producer.push_frame_sync(
            texture.handle.clone(),
            texture.kind,
            width,
            height,
            front_facing,
        ) {
            Ok(index) => index,
            Err(e) => {
                warn!("frame hand-off failed: {e}");
                return false;
            }
        };
        let handoff_us = started.elapsed().as_micros() as u64;
        metrics::histogram!("preen_handoff_us").record(handoff_us as f64);
        debug!(index, handoff_us, "hand-off accepted");

        // The consumer compares against the facing of the frame we just
        // pushed, so update the shared copy before scheduling consumption.
        self.shared
            .front_facing
            .store(front_facing, Ordering::Relaxed);
        if self.shared.released.load(Ordering::Acquire) {
            return false;
        }
        if let Err(e) = self.consumer.consume(&self.producer, index) {
            warn!("failed to schedule frame consumption: {e}");
            return false;
        }

        if self.guard.observe(front_facing, self.switch_skip) {
            metrics::counter!("preen_skipped_frames").increment(1);
            debug!(front_facing, "skipping frame around camera switch");
            return false;
        }

        if self.store.has_pending() {
            if let Some((handle, out_width, out_height)) = self.store.published() {
                let buffer = TextureBuffer {
                    handle,
                    kind: TextureKind::Rgba,
                    width: out_width,
                    height: out_height,
                    // Keep the incoming frame's transform, not the
                    // processed texture's own mapping
                    transform: texture.transform,
                };
                frame.replace_buffer(
                    FrameBuffer::Texture(buffer),
                    frame.rotation(),
                    frame.timestamp_ns(),
                );
                self.store.clear_pending();
                self.published += 1;
                metrics::counter!("preen_published_frames").increment(1);
                return true;
            }
        }

        false
    }

    /// Tear the pipeline down. Further `process` calls return false; GPU
    /// resources are released on the render thread. Safe to call twice.
    pub fn release(&mut self) {
        if self.shared.released.swap(true, Ordering::AcqRel) {
            debug!("release called more than once");
        }

        let started = Instant::now();
        self.producer.release();
        debug!(
            cost_us = started.elapsed().as_micros() as u64,
            "producer released"
        );

        let store = Arc::clone(&self.store);
        if self.ctx.invoke(move |_gpu| store.release_target()).is_err() {
            warn!("render context already gone during release");
        }
        info!(
            cost_us = started.elapsed().as_micros() as u64,
            "pipeline released"
        );
    }

    pub fn is_released(&self) -> bool {
        self.shared.released.load(Ordering::Acquire)
    }

    /// Counters snapshot.
    pub fn stats(&self) -> PipelineStats {
        let (frames_pushed, frames_consumed, frames_overwritten) = self.producer.stats();
        PipelineStats {
            frames_pushed,
            frames_consumed,
            frames_overwritten,
            stale_drops: self.shared.stale_drops.load(Ordering::Relaxed),
            frames_published: self.published,
        }
    }
}

impl Drop for EffectPipeline {
    fn drop(&mut self) {
        if !self.is_released() {
            self.release();
        }
    }
}

/// Runs on the render thread for every consumed descriptor: transform,
/// composite into the output store, fence, then raise the pending flag.
fn consume_frame(
    gpu: &mut GpuState,
    descriptor: AsyncFrameDescriptor,
    shared: &SharedState,
    store: &OutputStore,
    transform: &Mutex<Box<dyn FrameTransform>>,
) {
    if shared.released.load(Ordering::Acquire) {
        return;
    }
    if descriptor.front_facing != shared.front_facing.load(Ordering::Relaxed) {
        shared.stale_drops.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("preen_stale_frames").increment(1);
        debug!(
            sequence = descriptor.sequence,
            "dropping frame from switched-away camera"
        );
        return;
    }

    let started = Instant::now();
    let result = transform.lock().transform(&gpu.handle(), &descriptor);
    metrics::histogram!("preen_transform_us").record(started.elapsed().as_micros() as f64);

    let result = match result {
        Ok(texture) => texture,
        Err(e) => {
            error!(sequence = descriptor.sequence, "frame transform failed: {e}");
            return;
        }
    };

    let mut slot = store.target();
    let target = slot.get_or_insert_with(|| RenderTarget::new(TEXTURE_FORMAT));
    target.set_size(gpu.device(), descriptor.width, descriptor.height);
    let Some(view) = target.view() else {
        return;
    };
    gpu.blitter().draw(
        gpu.device(),
        gpu.queue(),
        &result.view(),
        &IDENTITY_MATRIX,
        &view,
    );
    // The pending flag must never be observable before the pixels are:
    // wait for queued GPU work before raising it.
    let _ = gpu.device().poll(wgpu::Maintain::Wait);
    drop(slot);

    store.mark_pending();
}

#[cfg(test)]
mod tests {
    use super::SwitchGuard;

    #[test]
    fn steady_facing_passes_through() {
        let mut guard = SwitchGuard::new(false);
        for _ in 0..5 {
            assert!(!guard.observe(false, 2));
        }
    }

    #[test]
    fn switch_drains_three_frames() {
        let mut guard = SwitchGuard::new(false);
        // The switch frame plus the configured two drain frames
        assert!(guard.observe(true, 2));
        assert!(guard.observe(true, 2));
        assert!(guard.observe(true, 2));
        assert!(!guard.observe(true, 2));
    }

    #[test]
    fn skip_state_never_underflows() {
        let mut guard = SwitchGuard::new(true);
        for _ in 0..10 {
            assert!(!guard.observe(true, 2));
        }
        assert_eq!(guard.skip_frames, 0);
    }

    #[test]
    fn switch_back_mid_drain_restarts_the_window() {
        let mut guard = SwitchGuard::new(false);
        assert!(guard.observe(true, 2));
        assert!(guard.observe(true, 2));
        // Flipping again re-arms the full window
        assert!(guard.observe(false, 2));
        assert!(guard.observe(false, 2));
        assert!(guard.observe(false, 2));
        assert!(!guard.observe(false, 2));
    }

    #[test]
    fn zero_skip_config_only_drops_the_switch_frame() {
        let mut guard = SwitchGuard::new(false);
        assert!(guard.observe(true, 0));
        assert!(!guard.observe(true, 0));
    }
}
