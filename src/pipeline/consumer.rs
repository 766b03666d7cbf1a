//! Render-thread consumption of handed-off frames.

use std::sync::Arc;

use crate::error::PipelineError;
use crate::gpu::{GpuState, RenderContext};
use crate::pipeline::handoff::{AsyncFrameDescriptor, FrameProducer};

pub(crate) type ConsumedCallback = Arc<dyn Fn(&mut GpuState, AsyncFrameDescriptor) + Send + Sync>;

/// Schedules the consumed callback on the render thread after a hand-off.
///
/// The callback runs asynchronously with respect to the caller: the
/// controller's invocation that pushed the frame has usually returned by
/// the time it fires.
pub struct FrameConsumer {
    ctx: Arc<RenderContext>,
    on_consumed: ConsumedCallback,
}

impl FrameConsumer {
    pub(crate) fn new(ctx: Arc<RenderContext>, on_consumed: ConsumedCallback) -> Self {
        Self { ctx, on_consumed }
    }

    /// Consume the descriptor at `index` on the render thread. A descriptor
    /// already taken (or cleared by release) is a silent no-op.
    pub fn consume(
        &self,
        producer: &Arc<FrameProducer>,
        index: usize,
    ) -> Result<(), PipelineError> {
        let producer = Arc::clone(producer);
        let on_consumed = Arc::clone(&self.on_consumed);
        self.ctx.post(move |gpu| {
            if let Some(descriptor) = producer.take(index) {
                on_consumed(gpu, descriptor);
            }
        })
    }
}
