//! Bounded job queue.
//!
//! Producers never wait: [`JobQueue::enqueue`] either hands the item to the
//! buffer or reports [`QueueError::Full`]. A pool of workers shares the
//! receiving end. Failed items are re-submitted after an exponential delay by
//! a task tracked together with the workers, so [`JobQueue::stop`] returns
//! only once nothing spawned by the queue is still running.
//!
//! Delivery is at-most-once. Items still buffered when the queue stops are
//! never started.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use gameshelf_config::JobsConfig;
use parking_lot::RwLock;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::error::QueueError;
use crate::handler::HandlerRegistry;
use crate::types::{QueueStats, WorkItem};

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    completed: AtomicU64,
    retried: AtomicU64,
    exhausted: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

struct Inner {
    capacity: usize,
    max_retries: u32,
    backoff_unit: Duration,
    handlers: HandlerRegistry,
    /// `None` once the queue is closed for producers
    sender: RwLock<Option<mpsc::Sender<WorkItem>>>,
    receiver: Mutex<mpsc::Receiver<WorkItem>>,
    accepting: AtomicBool,
    started: AtomicBool,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    counters: Counters,
}

/// Fixed-capacity work queue drained by a worker pool.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl JobQueue {
    /// Queue sized and tuned from the `[jobs]` config section.
    pub fn new(config: &JobsConfig, handlers: HandlerRegistry) -> Self {
        Self::with_options(
            config.capacity,
            config.max_retries,
            config.backoff_unit(),
            handlers,
        )
    }

    /// `capacity` is clamped to at least one slot and `max_retries` to at
    /// least one attempt.
    pub fn with_options(
        capacity: usize,
        max_retries: u32,
        backoff_unit: Duration,
        handlers: HandlerRegistry,
    ) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                capacity,
                max_retries: max_retries.max(1),
                backoff_unit,
                handlers,
                sender: RwLock::new(Some(tx)),
                receiver: Mutex::new(rx),
                accepting: AtomicBool::new(true),
                started: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
                counters: Counters::default(),
            }),
        }
    }

    /// Offer `item` to the buffer without waiting.
    ///
    /// # Errors
    ///
    /// [`QueueError::Full`] when the buffer is at capacity,
    /// [`QueueError::Closed`] after [`stop`](Self::stop).
    pub fn enqueue(&self, item: WorkItem) -> Result<(), QueueError> {
        let inner = &self.inner;
        if !inner.accepting.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        let guard = inner.sender.read();
        let Some(sender) = guard.as_ref() else {
            return Err(QueueError::Closed);
        };

        let id = item.id.clone();
        let kind = item.kind;
        match sender.try_send(item) {
            Ok(()) => {
                inner.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                debug!(job_id = %id, kind = %kind, "Job enqueued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                inner.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(job_id = %id, kind = %kind, capacity = inner.capacity, "Job queue full, rejecting");
                Err(QueueError::Full {
                    capacity: inner.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Spawn `workers` workers. Can be called once.
    ///
    /// # Errors
    ///
    /// [`QueueError::AlreadyStarted`] on a second call,
    /// [`QueueError::Closed`] if the queue was already stopped.
    pub fn start(&self, workers: usize) -> Result<(), QueueError> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return Err(QueueError::Closed);
        }
        if inner
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(QueueError::AlreadyStarted);
        }

        let workers = workers.max(1);
        for worker_id in 0..workers {
            inner.tracker.spawn(worker_loop(Arc::clone(inner), worker_id));
        }
        info!(
            workers,
            capacity = inner.capacity,
            max_retries = inner.max_retries,
            "Job queue started"
        );
        Ok(())
    }

    /// Stop accepting work and wait for in-flight items and pending retry
    /// delays to finish. Buffered items that no worker picked up are lost.
    pub async fn stop(&self) {
        let inner = &self.inner;
        if inner.accepting.swap(false, Ordering::AcqRel) {
            info!(pending = self.len(), "Job queue stopping");
        }
        inner.shutdown.cancel();
        inner.sender.write().take();
        inner.tracker.close();
        inner.tracker.wait().await;
        debug!("Job queue stopped");
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.counters.snapshot()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Items currently buffered, not counting in-flight ones.
    pub fn len(&self) -> usize {
        match self.inner.sender.read().as_ref() {
            Some(sender) => self.inner.capacity - sender.capacity(),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::Acquire)
    }
}

async fn worker_loop(inner: Arc<Inner>, worker_id: usize) {
    debug!(worker_id, "Job worker started");
    loop {
        let next = {
            let mut receiver = tokio::select! {
                biased;
                _ = inner.shutdown.cancelled() => break,
                receiver = inner.receiver.lock() => receiver,
            };
            tokio::select! {
                biased;
                _ = inner.shutdown.cancelled() => None,
                item = receiver.recv() => item,
            }
        };

        let Some(item) = next else {
            break;
        };
        process(&inner, item).await;
    }
    debug!(worker_id, "Job worker exited");
}

async fn process(inner: &Arc<Inner>, mut item: WorkItem) {
    item.attempt += 1;

    let Err(e) = inner.handlers.dispatch(&item).await else {
        inner.counters.completed.fetch_add(1, Ordering::Relaxed);
        debug!(job_id = %item.id, kind = %item.kind, attempt = item.attempt, "Job completed");
        return;
    };

    if item.attempt >= inner.max_retries {
        inner.counters.exhausted.fetch_add(1, Ordering::Relaxed);
        error!(
            job_id = %item.id,
            kind = %item.kind,
            owner = %item.owner_key,
            attempt = item.attempt,
            error = %e,
            "Job failed permanently after {} attempts",
            item.attempt
        );
        return;
    }

    let delay = backoff_delay(inner.backoff_unit, item.attempt);
    inner.counters.retried.fetch_add(1, Ordering::Relaxed);
    warn!(
        job_id = %item.id,
        kind = %item.kind,
        attempt = item.attempt,
        retry_in_ms = millis(delay),
        error = %e,
        "Job failed, scheduling retry"
    );

    inner
        .tracker
        .spawn(resubmit_after(Arc::clone(inner), item, delay));
}

async fn resubmit_after(inner: Arc<Inner>, item: WorkItem, delay: Duration) {
    tokio::select! {
        biased;
        _ = inner.shutdown.cancelled() => {
            inner.counters.dropped.fetch_add(1, Ordering::Relaxed);
            error!(
                job_id = %item.id,
                kind = %item.kind,
                attempt = item.attempt,
                "Queue stopped before retry, job abandoned"
            );
            return;
        }
        _ = tokio::time::sleep(delay) => {}
    }

    let sender = inner.sender.read().clone();
    let result = match sender {
        Some(sender) => sender.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(item) => (item, "buffer full"),
            mpsc::error::TrySendError::Closed(item) => (item, "queue closed"),
        }),
        None => Err((item, "queue closed")),
    };

    if let Err((item, reason)) = result {
        inner.counters.dropped.fetch_add(1, Ordering::Relaxed);
        error!(
            job_id = %item.id,
            kind = %item.kind,
            attempt = item.attempt,
            reason,
            "Retry could not be re-enqueued, job dropped"
        );
    }
}

/// Milliseconds for log fields, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// `unit * 2^(attempt - 1)`, saturating.
fn backoff_delay(unit: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    unit.saturating_mul(factor)
}
