//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Retry disposition of a failed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Redelivery cannot change the outcome; acknowledge and drop.
    Fatal,
    /// A later attempt may succeed; leave unacknowledged for redelivery.
    Transient,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Media error: {0}")]
    Media(#[from] vframe_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] vframe_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] vframe_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Classification as tagged at the error's point of origin. The consumer
    /// reads this to pick an acknowledgment action; it never reclassifies.
    pub fn classification(&self) -> ErrorClass {
        match self {
            WorkerError::Media(e) if e.is_fatal() => ErrorClass::Fatal,
            WorkerError::Storage(e) if e.is_fatal() => ErrorClass::Fatal,
            _ => ErrorClass::Transient,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.classification() == ErrorClass::Fatal
    }
}
