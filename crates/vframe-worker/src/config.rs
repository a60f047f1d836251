//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Frame rate the retained frames approximate
    pub target_fps: f64,
    /// Maximum concurrent uploads per segment (one batch)
    pub upload_batch_size: usize,
    /// Maximum concurrent segment jobs
    pub max_concurrent_jobs: usize,
    /// Directory for scratch files
    pub work_dir: String,
    /// Lease renewals fire this far before the visibility timeout elapses
    pub lease_margin: Duration,
    /// How often the worker scans for lapsed pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery)
    pub claim_min_idle: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            target_fps: 1.0,
            upload_batch_size: 100,
            max_concurrent_jobs: 2,
            work_dir: "/tmp/vframe".to_string(),
            lease_margin: Duration::from_secs(1),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            target_fps: std::env::var("WORKER_TARGET_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            upload_batch_size: std::env::var("WORKER_UPLOAD_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or_else(|_| "/tmp/vframe".to_string()),
            lease_margin: Duration::from_secs(
                std::env::var("WORKER_LEASE_MARGIN_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1),
            ),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("WORKER_CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}
