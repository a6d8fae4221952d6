use thiserror::Error;

/// Boxed error returned by job handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// Buffer is at capacity. The caller decides whether to drop or retry.
    #[error("Job queue is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("Job queue is closed")]
    Closed,

    #[error("Job queue workers already started")]
    AlreadyStarted,
}

impl QueueError {
    /// Backpressure, as opposed to a queue that will never accept again.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full { .. })
    }
}
