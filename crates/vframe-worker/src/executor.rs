//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vframe_models::FrameMap;
use vframe_queue::{JobQueue, SegmentJob};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::lease::{LeaseKeeper, SegmentLease};
use crate::logging::JobLogger;
use crate::pipeline::{FramePipeline, PipelineEvent};
use crate::publisher::EventPublisher;
use crate::retry::{retry_async, RetryConfig};

/// Terminal disposition of one processing attempt.
///
/// Only the executor maps this onto an acknowledgment action; the pipeline
/// knows nothing about the queue.
pub enum SegmentOutcome {
    /// Acknowledge the message.
    Completed(FrameMap),
    /// Record on the dead letter stream and acknowledge; redelivery cannot help.
    FatalFailure(WorkerError),
    /// Take no action; the lease lapses and the queue redelivers.
    TransientFailure(WorkerError),
}

/// Shared handles for processing jobs, built once in the composition root.
pub struct ProcessingContext {
    pub pipeline: Arc<FramePipeline>,
    pub publisher: EventPublisher,
    pub config: WorkerConfig,
}

/// Consumes segment jobs from the queue and processes them.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    ctx: Arc<ProcessingContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: JobQueue, ctx: ProcessingContext) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            ctx: Arc::new(ctx),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        // Periodically re-claim jobs whose lease lapsed (crashed workers).
        let queue_clone = Arc::clone(&self.queue);
        let consumer_name = self.consumer_name.clone();
        let ctx_clone = Arc::clone(&self.ctx);
        let semaphore_clone = Arc::clone(&self.job_semaphore);
        let claim_interval = self.config.claim_interval;
        let claim_min_idle = self.config.claim_min_idle;
        let mut shutdown_rx_claim = self.shutdown.subscribe();

        let claim_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx_claim.changed() => {
                        if *shutdown_rx_claim.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match queue_clone
                            .claim_pending(&consumer_name, claim_min_idle.as_millis() as u64, 5)
                            .await
                        {
                            Ok(jobs) if !jobs.is_empty() => {
                                info!("Claimed {} lapsed jobs", jobs.len());
                                for (message_id, job) in jobs {
                                    let ctx = Arc::clone(&ctx_clone);
                                    let queue = Arc::clone(&queue_clone);
                                    let consumer = consumer_name.clone();
                                    let permit =
                                        match semaphore_clone.clone().acquire_owned().await {
                                            Ok(permit) => permit,
                                            Err(_) => break,
                                        };

                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute_job(ctx, queue, consumer, message_id, job)
                                            .await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Failed to claim lapsed jobs: {}", e);
                            }
                        }
                    }
                }
            }
        });

        // Main job consumption loop
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Consume and process new jobs from the queue.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(
                &self.consumer_name,
                1000, // Block for 1 second
                available.min(5),
            )
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let ctx = Arc::clone(&self.ctx);
            let queue = Arc::clone(&self.queue);
            let consumer = self.consumer_name.clone();
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::from(std::io::Error::other("semaphore closed")))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(ctx, queue, consumer, message_id, job).await;
            });
        }

        Ok(())
    }

    /// Process a single message: keep the lease alive for the duration, then
    /// take exactly one acknowledgment action chosen by the outcome's
    /// classification.
    async fn execute_job(
        ctx: Arc<ProcessingContext>,
        queue: Arc<JobQueue>,
        consumer_name: String,
        message_id: String,
        job: SegmentJob,
    ) {
        let logger = JobLogger::new(&job.job_id, "process_segment");
        logger.log_start(&format!(
            "Processing segment {} of video {}",
            job.segment_idx, job.video_id
        ));

        let lease = SegmentLease::new(Arc::clone(&queue), consumer_name, message_id.clone());
        let keeper = LeaseKeeper::spawn(
            Arc::new(lease),
            queue.visibility_timeout(),
            ctx.config.lease_margin,
        );

        let mut rx = ctx.pipeline.process(job.clone());
        let mut outcome: Option<SegmentOutcome> = None;

        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Frame(frame) => {
                    ctx.publisher.frame_created(&job, &frame).await;
                }
                PipelineEvent::Done(map) => {
                    outcome = Some(SegmentOutcome::Completed(map));
                }
                PipelineEvent::Failed(e) => {
                    outcome = Some(if e.is_fatal() {
                        SegmentOutcome::FatalFailure(e)
                    } else {
                        SegmentOutcome::TransientFailure(e)
                    });
                }
            }
        }

        // Renewal stops before any acknowledgment action.
        keeper.stop().await;

        // A closed channel without a terminal event means the pipeline task
        // died; leave the message for redelivery.
        let outcome = outcome.unwrap_or_else(|| {
            SegmentOutcome::TransientFailure(WorkerError::from(std::io::Error::other(
                "pipeline ended without a terminal event",
            )))
        });

        match outcome {
            SegmentOutcome::Completed(map) => {
                ctx.publisher.segment_done(&job, map.len() as u32).await;

                let ack_retry = RetryConfig::new("ack");
                if let Err(e) = retry_async(&ack_retry, || queue.ack(&message_id)).await {
                    // Redelivery will reprocess; deterministic keys make that
                    // an overwrite, not a duplicate.
                    error!(job_id = %job.job_id, "Failed to ack finished job: {}", e);
                }
                logger.log_completion(&format!("Uploaded {} frames", map.len()));
            }
            SegmentOutcome::FatalFailure(e) => {
                ctx.publisher.segment_failed(&job, &e.to_string()).await;
                if let Err(dlq_err) = queue.dead_letter(&message_id, &job, &e.to_string()).await {
                    error!(job_id = %job.job_id, "Failed to dead letter job: {}", dlq_err);
                }
                logger.log_error(&format!("Dropped after fatal failure: {}", e));
            }
            SegmentOutcome::TransientFailure(e) => {
                logger.log_warning(&format!(
                    "Left unacknowledged after transient failure, will be redelivered: {}",
                    e
                ));
            }
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            let available = self.job_semaphore.available_permits();
            if available == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
