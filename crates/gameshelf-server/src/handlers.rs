//! Job handlers registered at startup.
//!
//! Delivery backends are not wired in yet; each handler records the work it
//! would perform so the queue's retry and drain behavior is observable.

use async_trait::async_trait;
use gameshelf_jobs::{BoxError, HandlerRegistry, JobHandler, JobKind, WorkItem};
use tracing::info;

/// Logs the item and succeeds. Fails only on an empty owner.
pub struct LoggingHandler;

#[async_trait]
impl JobHandler for LoggingHandler {
    async fn handle(&self, item: &WorkItem) -> Result<(), BoxError> {
        if item.owner_key.is_empty() {
            return Err(format!("job {} has no owner", item.id).into());
        }
        let payload = serde_json::to_string(&item.payload)?;
        info!(
            job_id = %item.id,
            kind = %item.kind,
            owner = %item.owner_key,
            attempt = item.attempt,
            payload = %payload,
            "Job handled"
        );
        Ok(())
    }
}

/// One [`LoggingHandler`] per known job kind.
pub fn default_registry() -> HandlerRegistry {
    HandlerRegistry::new()
        .register(JobKind::Notification, LoggingHandler)
        .register(JobKind::WishlistAlert, LoggingHandler)
        .register(JobKind::DashboardRefresh, LoggingHandler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn every_kind_has_a_handler() {
        let registry = default_registry();
        for kind in [
            JobKind::Notification,
            JobKind::WishlistAlert,
            JobKind::DashboardRefresh,
        ] {
            let item = WorkItem::new(kind, "user-1").with_payload("game_id", json!(7));
            assert!(registry.dispatch(&item).await.is_ok(), "{kind} failed");
        }
    }

    #[tokio::test]
    async fn empty_owner_fails() {
        let item = WorkItem::new(JobKind::Notification, "");
        assert!(LoggingHandler.handle(&item).await.is_err());
    }
}
