//! End-to-end pipeline tests.
//!
//! Every test needs a real GPU device; on machines with no adapter the
//! tests skip instead of failing.

use std::sync::Arc;

use preen::source::TestPatternSource;
use preen::transform::Passthrough;
use preen::{
    CameraFacing, EffectPipeline, FrameBuffer, PipelineError, RenderContext, SourceConfig,
    VideoFrame,
};

fn test_context() -> Option<Arc<RenderContext>> {
    match RenderContext::new(&Default::default()) {
        Ok(ctx) => Some(ctx),
        Err(PipelineError::NoAdapter) => {
            eprintln!("no GPU adapter available, skipping");
            None
        }
        Err(e) => panic!("render context setup failed: {e}"),
    }
}

fn test_source(ctx: &Arc<RenderContext>) -> TestPatternSource {
    let config = SourceConfig {
        width: 1280,
        height: 720,
        fps: 30,
        facing_flip_frames: 0,
    };
    TestPatternSource::new(Arc::clone(ctx), config).expect("source setup")
}

fn test_pipeline(ctx: &Arc<RenderContext>) -> EffectPipeline {
    EffectPipeline::new(Arc::clone(ctx), Box::new(Passthrough))
}

/// Block until every render-thread job queued so far has run, which makes
/// "the consumer finished frame N" a deterministic precondition.
fn flush(ctx: &Arc<RenderContext>) {
    ctx.invoke(|_| ()).expect("render thread alive");
}

#[test]
fn process_after_release_returns_false_and_freezes_counters() {
    let Some(ctx) = test_context() else { return };
    let mut source = test_source(&ctx);
    let mut pipeline = test_pipeline(&ctx);

    pipeline.release();
    let before = pipeline.stats();

    for _ in 0..3 {
        let mut frame = source.next_frame(CameraFacing::Back).expect("frame");
        assert!(!pipeline.process(&mut frame));
    }

    let after = pipeline.stats();
    assert_eq!(before.frames_pushed, after.frames_pushed);
    assert_eq!(before.frames_published, after.frames_published);
}

#[test]
fn non_texture_frames_are_rejected_unchanged() {
    let Some(ctx) = test_context() else { return };
    let mut pipeline = test_pipeline(&ctx);

    let mut frame = VideoFrame::new(
        FrameBuffer::Memory(preen::MemoryBuffer {
            data: bytes::Bytes::from_static(&[0u8; 16]),
            width: 2,
            height: 2,
            format: preen::PixelFormat::Rgba8,
        }),
        90,
        1_234,
        CameraFacing::Back,
    );

    assert!(!pipeline.process(&mut frame));
    assert!(frame.buffer().as_texture().is_none());
    assert_eq!(frame.rotation(), 90);
    assert_eq!(frame.timestamp_ns(), 1_234);
    assert_eq!(pipeline.stats().frames_pushed, 0);

    pipeline.release();
}

#[test]
fn publishes_the_previously_finished_frame() {
    let Some(ctx) = test_context() else { return };
    let mut source = test_source(&ctx);
    let mut pipeline = test_pipeline(&ctx);

    // The result of a submission is never visible within the same call
    let mut first = source.next_frame(CameraFacing::Back).expect("frame");
    assert!(!pipeline.process(&mut first));

    // Once the consumer has finished, the next frame carries the result
    flush(&ctx);
    let mut second = source.next_frame(CameraFacing::Back).expect("frame");
    let input_texture = second
        .buffer()
        .as_texture()
        .expect("texture-backed")
        .handle
        .clone();
    assert!(pipeline.process(&mut second));

    let replaced = second.buffer().as_texture().expect("texture-backed");
    assert_eq!(replaced.width, 1280);
    assert_eq!(replaced.height, 720);
    assert!(!replaced.handle.same_texture(&input_texture));

    assert_eq!(pipeline.stats().frames_published, 1);
    pipeline.release();
}

#[test]
fn publication_preserves_the_current_frames_rotation_and_timestamp() {
    let Some(ctx) = test_context() else { return };
    let mut source = test_source(&ctx);
    let mut pipeline = test_pipeline(&ctx);

    let mut first = source.next_frame(CameraFacing::Back).expect("frame");
    assert!(!pipeline.process(&mut first));
    flush(&ctx);

    let raw = source.next_frame(CameraFacing::Back).expect("frame");
    let buffer = raw.buffer().clone();
    let mut current = VideoFrame::new(buffer, 270, 77_000, CameraFacing::Back);

    assert!(pipeline.process(&mut current));
    // Stamped from the frame being returned, not the one that produced
    // the published pixels
    assert_eq!(current.rotation(), 270);
    assert_eq!(current.timestamp_ns(), 77_000);

    pipeline.release();
}

#[test]
fn facing_switch_drains_three_frames_before_publishing_again() {
    let Some(ctx) = test_context() else { return };
    let mut source = test_source(&ctx);
    let mut pipeline = test_pipeline(&ctx);

    // Warm up on the back camera until results flow
    let mut warmup = source.next_frame(CameraFacing::Back).expect("frame");
    assert!(!pipeline.process(&mut warmup));
    flush(&ctx);
    let mut warmup = source.next_frame(CameraFacing::Back).expect("frame");
    assert!(pipeline.process(&mut warmup));
    flush(&ctx);

    // Switch to the front camera: the switch frame and the two drain
    // frames are never published, pending results notwithstanding
    for _ in 0..3 {
        let mut frame = source.next_frame(CameraFacing::Front).expect("frame");
        assert!(!pipeline.process(&mut frame));
        flush(&ctx);
    }

    // The fourth front frame publishes a front-era result
    let mut frame = source.next_frame(CameraFacing::Front).expect("frame");
    assert!(pipeline.process(&mut frame));

    pipeline.release();
}

#[test]
fn double_release_is_safe() {
    let Some(ctx) = test_context() else { return };
    let mut pipeline = test_pipeline(&ctx);

    pipeline.release();
    pipeline.release();
    assert!(pipeline.is_released());
}

#[test]
fn hand_off_counters_track_submissions() {
    let Some(ctx) = test_context() else { return };
    let mut source = test_source(&ctx);
    let mut pipeline = test_pipeline(&ctx);

    for _ in 0..4 {
        let mut frame = source.next_frame(CameraFacing::Back).expect("frame");
        pipeline.process(&mut frame);
        flush(&ctx);
    }

    let stats = pipeline.stats();
    assert_eq!(stats.frames_pushed, 4);
    assert_eq!(stats.frames_consumed, 4);
    assert_eq!(stats.frames_overwritten, 0);

    pipeline.release();
}
