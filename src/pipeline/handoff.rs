//! Synchronous frame hand-off from the caller thread to the render thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::PipelineError;
use crate::frame::{TextureHandle, TextureKind, IDENTITY_MATRIX};
use crate::gpu::{GpuState, RenderContext};

/// The unit passed from producer to consumer: one frame's texture plus the
/// metadata the consumer needs. Taken exactly once; the pool slot behind it
/// is then reusable.
#[derive(Debug, Clone)]
pub struct AsyncFrameDescriptor {
    pub texture: TextureHandle,
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    pub front_facing: bool,
    pub sequence: u64,
}

#[derive(Default)]
struct PoolSlot {
    texture: Option<TextureHandle>,
    width: u32,
    height: u32,
    descriptor: Option<AsyncFrameDescriptor>,
}

impl PoolSlot {
    /// Texture for this slot, re-allocated when the frame size changes.
    fn acquire(&mut self, gpu: &GpuState, width: u32, height: u32) -> TextureHandle {
        match &self.texture {
            Some(texture) if self.width == width && self.height == height => texture.clone(),
            _ => {
                let texture = gpu.create_texture("hand-off slot", width, height);
                self.texture = Some(texture.clone());
                self.width = width;
                self.height = height;
                texture
            }
        }
    }
}

struct Pool {
    slots: Vec<PoolSlot>,
    next: usize,
}

#[derive(Default)]
struct HandoffStats {
    frames_pushed: AtomicU64,
    frames_taken: AtomicU64,
    frames_overwritten: AtomicU64,
}

/// Synchronous hand-off point between the caller thread and the render
/// thread.
///
/// `push_frame_sync` returns only once the render thread has copied the
/// caller's texture into an internal pool slot, so the caller may reuse its
/// texture immediately after the call and at most one descriptor is in
/// flight at a time (the render thread's FIFO queue delivers the previous
/// frame's consumption before it accepts the next copy).
pub struct FrameProducer {
    ctx: Arc<RenderContext>,
    pool: Arc<Mutex<Pool>>,
    released: AtomicBool,
    sequence: AtomicU64,
    stats: CachePadded<HandoffStats>,
}

impl FrameProducer {
    pub fn new(ctx: Arc<RenderContext>, slots: usize) -> Self {
        let slots = slots.max(1);
        Self {
            ctx,
            pool: Arc::new(Mutex::new(Pool {
                slots: (0..slots).map(|_| PoolSlot::default()).collect(),
                next: 0,
            })),
            released: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            stats: CachePadded::new(HandoffStats::default()),
        }
    }

    /// Hand one frame to the render thread. Blocks until the texture has
    /// been copied; returns the pool index holding the descriptor.
    pub fn push_frame_sync(
        &self,
        source: TextureHandle,
        kind: TextureKind,
        width: u32,
        height: u32,
        front_facing: bool,
    ) -> Result<usize, PipelineError> {
        if self.released.load(Ordering::Acquire) {
            return Err(PipelineError::Released);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let pool = Arc::clone(&self.pool);

        let (index, overwritten) = self.ctx.invoke(move |gpu| {
            let mut pool = pool.lock();
            let slot_count = pool.slots.len();
            let index = pool.next;
            pool.next = (index + 1) % slot_count;

            let slot = &mut pool.slots[index];
            let texture = slot.acquire(gpu, width, height);
            gpu.blitter().draw(
                gpu.device(),
                gpu.queue(),
                &source.view(),
                &IDENTITY_MATRIX,
                &texture.view(),
            );

            let previous = slot.descriptor.replace(AsyncFrameDescriptor {
                texture,
                kind,
                width,
                height,
                front_facing,
                sequence,
            });
            (index, previous.is_some())
        })?;

        self.stats.frames_pushed.fetch_add(1, Ordering::Relaxed);
        if overwritten {
            self.stats.frames_overwritten.fetch_add(1, Ordering::Relaxed);
            debug!(index, "hand-off slot overwritten before consumption");
        }
        Ok(index)
    }

    /// Take the descriptor held at `index`; called on the render thread by
    /// the consumer.
    pub fn take(&self, index: usize) -> Option<AsyncFrameDescriptor> {
        let descriptor = self.pool.lock().slots.get_mut(index)?.descriptor.take();
        if descriptor.is_some() {
            self.stats.frames_taken.fetch_add(1, Ordering::Relaxed);
        }
        descriptor
    }

    /// Counters snapshot: (pushed, taken, overwritten).
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.stats.frames_pushed.load(Ordering::Relaxed),
            self.stats.frames_taken.load(Ordering::Relaxed),
            self.stats.frames_overwritten.load(Ordering::Relaxed),
        )
    }

    /// Tear down the pool on the render thread. Tolerates the context being
    /// gone and a consumer mid-flight; later pushes fail with `Released`.
    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
        let pool = Arc::clone(&self.pool);
        let _ = self.ctx.invoke(move |_gpu| {
            let mut pool = pool.lock();
            for slot in &mut pool.slots {
                slot.texture = None;
                slot.descriptor = None;
                slot.width = 0;
                slot.height = 0;
            }
        });
    }
}
