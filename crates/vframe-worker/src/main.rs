//! Segment processing worker binary.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vframe_queue::{FrameEventChannel, JobQueue};
use vframe_storage::StorageClient;
use vframe_worker::pipeline::{FfmpegDecoder, FrameStore, SegmentDecoder};
use vframe_worker::{EventPublisher, FramePipeline, JobExecutor, ProcessingContext, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::from_default_env().add_directive("vframe=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vframe-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Err(e) = vframe_media::check_ffmpeg() {
        // Jobs will fail transient until the host is fixed; redelivery covers us.
        warn!("FFmpeg not available: {}", e);
    }

    if let Err(e) = tokio::fs::create_dir_all(&config.work_dir).await {
        error!("Failed to create work dir {}: {}", config.work_dir, e);
        std::process::exit(1);
    }

    let queue = match JobQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let storage = match StorageClient::from_env().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    let events = match FrameEventChannel::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create event channel: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline = Arc::new(FramePipeline::new(
        reqwest::Client::new(),
        Arc::new(FfmpegDecoder) as Arc<dyn SegmentDecoder>,
        Arc::new(storage) as Arc<dyn FrameStore>,
        config.target_fps,
        config.upload_batch_size,
        config.work_dir.clone(),
    ));

    let ctx = ProcessingContext {
        pipeline,
        publisher: EventPublisher::new(Arc::new(events)),
        config: config.clone(),
    };

    let executor = Arc::new(JobExecutor::new(config, queue, ctx));

    // Shut the executor down on ctrl-c
    let shutdown_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
