use thiserror::Error;

use crate::scheduler::SchedulerState;

/// Boxed error returned by scheduled work.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start` was called on a scheduler that already left `Created`.
    #[error("Scheduler '{name}' cannot start from state {state:?}")]
    AlreadyStarted { name: String, state: SchedulerState },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BootstrapError {
    /// The shared cancellation signal fired while `gate` was pending.
    #[error("Bootstrap cancelled during gate '{gate}'")]
    Cancelled { gate: String },
}
