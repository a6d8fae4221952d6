//! Component wiring and process lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use gameshelf_auth::{CredentialManager, HttpTokenIssuer};
use gameshelf_cache::{InMemoryTier, MultiTierCache, RedisTier, RemoteTier};
use gameshelf_config::{AppConfig, BootstrapConfig, RefreshConfig};
use gameshelf_jobs::{HandlerRegistry, JobQueue};
use gameshelf_runtime::{
    CredentialRefreshTask, IntervalScheduler, credential_bootstrap, remote_ready_predicate,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::handlers::default_registry;

pub struct App {
    config: AppConfig,
    cache: Arc<MultiTierCache>,
    credentials: Option<Arc<CredentialManager>>,
    queue: JobQueue,
    cancel: CancellationToken,
}

impl App {
    pub fn build(config: AppConfig) -> anyhow::Result<Self> {
        Self::with_handlers(config, default_registry())
    }

    pub fn with_handlers(config: AppConfig, handlers: HandlerRegistry) -> anyhow::Result<Self> {
        config.validate()?;

        let remote = remote_tier(&config)?;
        let cache = Arc::new(MultiTierCache::new(
            remote,
            config.cache.local_ttl(),
            config.cache.default_ttl(),
        ));

        let credentials = if config.credentials.is_configured() {
            let issuer = HttpTokenIssuer::new(&config.credentials)
                .context("failed to build credential issuer")?;
            Some(Arc::new(CredentialManager::new(
                cache.clone(),
                Arc::new(issuer),
                config.credentials.cache_key.clone(),
            )))
        } else {
            warn!("credentials.issuer_url not set, credential bootstrap and refresh disabled");
            None
        };

        let queue = JobQueue::new(&config.jobs, handlers);

        Ok(Self {
            config,
            cache,
            credentials,
            queue,
            cancel: CancellationToken::new(),
        })
    }

    pub fn cache(&self) -> &Arc<MultiTierCache> {
        &self.cache
    }

    pub fn credentials(&self) -> Option<&Arc<CredentialManager>> {
        self.credentials.as_ref()
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Token that stops the whole process when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start the job workers and the credential lifecycle, then wait for
    /// `shutdown` (or the cancel token) and drain.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        self.queue.start(self.config.jobs.workers)?;

        let lifecycle = self.credentials.clone().map(|manager| {
            tokio::spawn(credential_lifecycle(
                self.config.bootstrap.clone(),
                self.config.refresh.clone(),
                self.cache.clone(),
                manager,
                self.cancel.clone(),
            ))
        });

        tokio::select! {
            _ = shutdown => info!("Shutdown requested"),
            _ = self.cancel.cancelled() => {}
        }
        self.cancel.cancel();

        if let Some(handle) = lifecycle
            && let Err(e) = handle.await
        {
            error!(error = %e, "Credential lifecycle task failed");
        }

        self.queue.stop().await;
        let stats = self.queue.stats();
        info!(
            enqueued = stats.enqueued,
            completed = stats.completed,
            exhausted = stats.exhausted,
            dropped = stats.dropped,
            rejected = stats.rejected,
            "Job queue drained"
        );
        Ok(())
    }
}

fn remote_tier(config: &AppConfig) -> anyhow::Result<Arc<dyn RemoteTier>> {
    if config.redis.enabled {
        let tier = RedisTier::connect(
            &config.redis.url,
            config.redis.pool_size,
            Duration::from_millis(config.redis.timeout_ms),
            config.cache.default_ttl(),
        )
        .context("failed to create Redis pool")?;
        Ok(Arc::new(tier))
    } else {
        info!("Redis disabled, using in-process remote tier");
        Ok(Arc::new(InMemoryTier::new(config.cache.default_ttl())))
    }
}

/// Bootstrap once, then refresh on a fixed interval until cancelled.
async fn credential_lifecycle(
    bootstrap: BootstrapConfig,
    refresh: RefreshConfig,
    cache: Arc<MultiTierCache>,
    manager: Arc<CredentialManager>,
    cancel: CancellationToken,
) {
    let pipeline = credential_bootstrap(&bootstrap, cache.clone(), manager.clone());
    if let Err(e) = pipeline.run(&cancel).await {
        info!(error = %e, "Credential bootstrap interrupted");
        return;
    }

    let scheduler = IntervalScheduler::new(
        "credential-refresh",
        refresh.interval(),
        Arc::new(CredentialRefreshTask::new(manager)),
    )
    .with_readiness(remote_ready_predicate(cache));

    if let Err(e) = scheduler.start(cancel).await {
        error!(error = %e, "Credential refresh scheduler failed to start");
    }
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
