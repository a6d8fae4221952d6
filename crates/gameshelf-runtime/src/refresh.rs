//! Periodic credential refresh.

use std::sync::Arc;

use async_trait::async_trait;
use gameshelf_auth::CredentialManager;
use gameshelf_cache::MultiTierCache;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;
use crate::scheduler::{ReadinessPredicate, ScheduledTask};

/// Re-runs the credential fallback chain on every tick.
///
/// While the cached credential is alive this is a cache hit; once both tiers
/// expire it triggers a fresh issuance.
pub struct CredentialRefreshTask {
    manager: Arc<CredentialManager>,
}

impl CredentialRefreshTask {
    pub fn new(manager: Arc<CredentialManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl ScheduledTask for CredentialRefreshTask {
    async fn run(&self, cancel: &CancellationToken) -> Result<(), BoxError> {
        self.manager.get_token(cancel).await?;
        Ok(())
    }
}

/// Ticks are skipped until the remote tier has answered a ping.
pub fn remote_ready_predicate(cache: Arc<MultiTierCache>) -> ReadinessPredicate {
    Arc::new(move || cache.remote_ready())
}
