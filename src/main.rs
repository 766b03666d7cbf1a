//! Preen demo: synthetic camera frames through the beautification pipeline

use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use flume::bounded;
use tracing::{error, info};

use preen::source::TestPatternSource;
use preen::transform::{ColorAdjustParams, ColorAdjustTransform};
use preen::{CameraFacing, Config, EffectPipeline, RenderContext, VideoFrame};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter("preen=debug")
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Preen launching...");

    // Load configuration
    let config = Config::default();
    preen::CONFIG.store(Arc::new(config.clone()));

    // Bring up the render thread and the pipeline
    let ctx = RenderContext::new(&config.gpu)?;
    let transform = ColorAdjustTransform::new(ColorAdjustParams {
        brightness: 0.05,
        contrast: 1.1,
        saturation: 1.2,
        ..Default::default()
    });
    let mut pipeline = EffectPipeline::new(Arc::clone(&ctx), Box::new(transform));

    let mut source = TestPatternSource::new(Arc::clone(&ctx), config.source.clone())?;

    // Set up tx/rx
    let (tx, rx) = bounded::<VideoFrame>(2);

    // Spawn the frame-producing task
    let interval = Duration::from_micros(1_000_000 / u64::from(config.source.fps.max(1)));
    let flip_frames = config.source.facing_flip_frames;
    let source_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut count: u64 = 0;
        loop {
            ticker.tick().await;
            // Flip facing periodically to exercise the switch-drain path
            let facing = if flip_frames > 0 && (count / flip_frames) % 2 == 1 {
                CameraFacing::Front
            } else {
                CameraFacing::Back
            };
            match source.next_frame(facing) {
                Ok(frame) => {
                    if tx.send_async(frame).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("frame source error: {e}");
                    break;
                }
            }
            count += 1;
        }
    });

    // Drive frames through the pipeline until Ctrl-C
    let mut processed: u64 = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            frame = rx.recv_async() => {
                let Ok(mut frame) = frame else { break };
                pipeline.process(&mut frame);
                processed += 1;
                if processed % 300 == 0 {
                    info!(processed, stats = ?pipeline.stats(), "pipeline progress");
                }
            }
        }
    }

    source_handle.abort();
    pipeline.release();
    info!(stats = ?pipeline.stats(), "final pipeline stats");

    info!("Preen shutting down");
    Ok(())
}
