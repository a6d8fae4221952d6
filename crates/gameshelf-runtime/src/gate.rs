//! Readiness gates consumed by the bootstrap pipeline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A check that passes once some external dependency is usable.
///
/// Probes report failure as `false` and log the reason themselves.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn probe(&self, cancel: &CancellationToken) -> bool;
}

/// Adapts an async closure into a [`ReadinessProbe`].
pub struct FnProbe<F>(pub F);

#[async_trait]
impl<F, Fut> ReadinessProbe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    async fn probe(&self, _cancel: &CancellationToken) -> bool {
        (self.0)().await
    }
}

/// One stage of the bootstrap pipeline.
#[derive(Clone)]
pub struct ReadinessGate {
    pub name: String,
    pub probe: Arc<dyn ReadinessProbe>,
    pub retry_interval: Duration,
}

impl ReadinessGate {
    pub fn new(
        name: impl Into<String>,
        retry_interval: Duration,
        probe: impl ReadinessProbe + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            probe: Arc::new(probe),
            retry_interval,
        }
    }

    /// Gate backed by an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, retry_interval: Duration, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self::new(name, retry_interval, FnProbe(f))
    }
}

impl std::fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("name", &self.name)
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}
