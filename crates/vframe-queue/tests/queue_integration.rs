//! Redis-backed queue integration tests.

use vframe_models::{Frame, SegmentEvent, VideoId};
use vframe_queue::{FrameEventChannel, JobQueue, SegmentJob};

fn test_job(segment_idx: u32) -> SegmentJob {
    SegmentJob::new(
        VideoId::new(),
        segment_idx,
        "https://cdn.example.com/videos/test/seg_0001.mp4",
        30.0,
        300,
    )
}

/// Test Redis connection and basic operations.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_connection() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let len = queue.len().await.expect("Failed to get queue length");
    println!("Queue length: {}", len);
}

/// Test job enqueue, consume and ack cycle.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_job_enqueue_consume_ack() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = test_job(1);
    let job_id = job.job_id.clone();

    let message_id = queue.enqueue(&job).await.expect("Failed to enqueue");
    println!("Enqueued job {} with message ID {}", job_id, message_id);

    let jobs = queue
        .consume("test-consumer", 1000, 1)
        .await
        .expect("Failed to consume");

    assert_eq!(jobs.len(), 1);
    let (msg_id, consumed_job) = &jobs[0];
    assert_eq!(consumed_job.job_id, job_id);

    queue.ack(msg_id).await.expect("Failed to ack");
    println!("Job {} acknowledged", job_id);
}

/// Test that touching a pending message keeps it out of claim_pending reach.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_lease_touch() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = test_job(2);
    queue.enqueue(&job).await.expect("Failed to enqueue");

    let consumer = "test-lease-consumer";
    let jobs = queue.consume(consumer, 1000, 1).await.expect("Failed to consume");
    assert!(!jobs.is_empty());
    let (message_id, _) = &jobs[0];

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    queue.touch(consumer, message_id).await.expect("Failed to touch");

    // Idle time was just reset, so a 100ms-min-idle claim must not grab it.
    let claimed = queue
        .claim_pending("test-thief", 100, 10)
        .await
        .expect("Failed to claim");
    assert!(
        !claimed.iter().any(|(id, _)| id == message_id),
        "touched message was claimable"
    );

    queue.ack(message_id).await.expect("Failed to ack");
}

/// Test redelivery of a lapsed message via claim_pending.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_claim_pending_redelivery() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = test_job(3);
    let job_id = job.job_id.clone();
    queue.enqueue(&job).await.expect("Failed to enqueue");

    // First consumer takes the message and "crashes" (never acks, never touches).
    let jobs = queue
        .consume("test-crashed-consumer", 1000, 1)
        .await
        .expect("Failed to consume");
    assert!(!jobs.is_empty());

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let claimed = queue
        .claim_pending("test-recovery-consumer", 200, 10)
        .await
        .expect("Failed to claim");

    let (message_id, reclaimed) = claimed
        .iter()
        .find(|(_, j)| j.job_id == job_id)
        .expect("lapsed job not redelivered");
    assert_eq!(reclaimed.segment_idx, 3);

    queue.ack(message_id).await.expect("Failed to ack");
}

/// Test dead letter record for terminal drops.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_dead_letter() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = test_job(4);
    let message_id = queue.enqueue(&job).await.expect("Failed to enqueue");

    let jobs = queue
        .consume("test-dlq-consumer", 1000, 1)
        .await
        .expect("Failed to consume");
    assert!(!jobs.is_empty());

    queue
        .dead_letter(&message_id, &job, "segment is not a video")
        .await
        .expect("Failed to dead letter");

    let dlq_len = queue.dlq_len().await.expect("Failed to get DLQ length");
    assert!(dlq_len > 0);
    println!("DLQ length: {}", dlq_len);
}

/// Test frame event publication to the output stream.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_frame_event_publication() {
    dotenvy::dotenv().ok();

    let channel = FrameEventChannel::from_env().expect("Failed to create event channel");

    let frame = Frame::new(15, "https://bucket.example.com/vid/seg_0001/15.jpg");
    let event = SegmentEvent::frame_created(VideoId::new(), 1, 30.0, 300, &frame);

    let entry_id = channel.publish(&event).await.expect("Failed to publish");
    println!("Published event {} to {}", entry_id, channel.stream());

    let done = SegmentEvent::segment_done(VideoId::new(), 1, 20);
    channel.publish(&done).await.expect("Failed to publish done");
}
