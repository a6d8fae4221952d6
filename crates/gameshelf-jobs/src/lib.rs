//! Deferred work for the gameshelf backend.
//!
//! Application code builds a [`WorkItem`] and hands it to
//! [`JobQueue::enqueue`]. Workers dispatch each item to the [`JobHandler`]
//! registered for its [`JobKind`] and retry failures with exponential backoff
//! up to a fixed attempt count.

pub mod error;
pub mod handler;
pub mod queue;
pub mod types;

pub use error::{BoxError, QueueError};
pub use handler::{HandlerRegistry, JobHandler};
pub use queue::JobQueue;
pub use types::{JobKind, QueueStats, WorkItem};
