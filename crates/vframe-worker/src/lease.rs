//! Lease keep-alive for in-flight queue messages.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use vframe_queue::{JobQueue, QueueResult};

use crate::retry::FailureTracker;

/// Renews ownership of one in-flight message.
#[async_trait]
pub trait LeaseRenewer: Send + Sync {
    async fn touch(&self) -> QueueResult<()>;
}

/// Lease on one consumed segment message, renewable via the queue.
pub struct SegmentLease {
    queue: Arc<JobQueue>,
    consumer_name: String,
    message_id: String,
}

impl SegmentLease {
    pub fn new(queue: Arc<JobQueue>, consumer_name: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            queue,
            consumer_name: consumer_name.into(),
            message_id: message_id.into(),
        }
    }
}

#[async_trait]
impl LeaseRenewer for SegmentLease {
    async fn touch(&self) -> QueueResult<()> {
        self.queue.touch(&self.consumer_name, &self.message_id).await
    }
}

/// Periodically renews a lease until stopped.
///
/// Each renewal fires `margin` before the visibility timeout would elapse
/// and is re-scheduled after it completes. Renewal failures are logged (with
/// suppression after repeated failures) but never interrupt processing; if
/// the lease truly lapses the queue redelivers and the worker's outcome for
/// the stale attempt is discarded by the deterministic upload keys.
pub struct LeaseKeeper {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl LeaseKeeper {
    /// Spawn the renewal loop.
    pub fn spawn(
        renewer: Arc<dyn LeaseRenewer>,
        visibility_timeout: Duration,
        margin: Duration,
    ) -> Self {
        let interval = renewal_interval(visibility_timeout, margin);
        let (stop, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut failures = FailureTracker::new(3);
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(interval) => {
                        match renewer.touch().await {
                            Ok(()) => {
                                failures.record_success();
                                debug!("Lease renewed");
                            }
                            Err(e) => {
                                if failures.record_failure() {
                                    warn!("Lease renewal failed: {}", e);
                                }
                            }
                        }
                    }
                }
            }
        });

        Self { stop, handle }
    }

    /// Stop renewal. No touch is issued after this returns.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}

/// Renewal cadence: strictly before the deadline, by `margin`.
fn renewal_interval(visibility_timeout: Duration, margin: Duration) -> Duration {
    visibility_timeout
        .checked_sub(margin)
        .filter(|d| !d.is_zero())
        .unwrap_or(visibility_timeout / 2)
}
