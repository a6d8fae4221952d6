//! Fixed-interval scheduler.
//!
//! Runs one unit of work per tick until cancelled. A failed tick is logged
//! and the next tick runs as usual.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{BoxError, SchedulerError};

/// Work executed on every tick.
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// `cancel` is the scheduler's own signal; work may watch it but is
    /// never preempted.
    async fn run(&self, cancel: &CancellationToken) -> Result<(), BoxError>;
}

/// Checked before each tick; `false` skips the tick.
pub type ReadinessPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Lifecycle of a scheduler. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Created,
    Running,
    Stopped,
}

impl SchedulerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Created,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

/// Tick counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub runs: u64,
    pub skipped: u64,
    pub failures: u64,
}

pub struct IntervalScheduler {
    name: String,
    period: Duration,
    task: Arc<dyn ScheduledTask>,
    readiness: Option<ReadinessPredicate>,
    state: AtomicU8,
    runs: AtomicU64,
    skipped: AtomicU64,
    failures: AtomicU64,
}

impl IntervalScheduler {
    pub fn new(name: impl Into<String>, period: Duration, task: Arc<dyn ScheduledTask>) -> Self {
        Self {
            name: name.into(),
            period,
            task,
            readiness: None,
            state: AtomicU8::new(SchedulerState::Created as u8),
            runs: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Skip ticks while `predicate` returns `false`.
    pub fn with_readiness(mut self, predicate: ReadinessPredicate) -> Self {
        self.readiness = Some(predicate);
        self
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            runs: self.runs.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Run the tick loop until `cancel` fires.
    ///
    /// The first tick happens one period after start. Cancellation is only
    /// observed between ticks, so a running task always completes.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::AlreadyStarted`] if called more than once.
    pub async fn start(&self, cancel: CancellationToken) -> Result<(), SchedulerError> {
        if let Err(current) = self.state.compare_exchange(
            SchedulerState::Created as u8,
            SchedulerState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return Err(SchedulerError::AlreadyStarted {
                name: self.name.clone(),
                state: SchedulerState::from_u8(current),
            });
        }

        info!(
            scheduler = %self.name,
            period_secs = self.period.as_secs_f64(),
            "Interval scheduler started"
        );

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    self.tick(&cancel).await;
                }
            }
        }

        self.state
            .store(SchedulerState::Stopped as u8, Ordering::Release);
        info!(scheduler = %self.name, "Interval scheduler stopped");
        Ok(())
    }

    async fn tick(&self, cancel: &CancellationToken) {
        if let Some(ready) = &self.readiness
            && !ready()
        {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            debug!(scheduler = %self.name, "Not ready, skipping tick");
            return;
        }

        match self.task.run(cancel).await {
            Ok(()) => {
                self.runs.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(scheduler = %self.name, error = %e, "Scheduled tick failed");
            }
        }
    }
}
