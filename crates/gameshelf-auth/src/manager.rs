//! Credential lifecycle: cached tiers first, issuer last.

use std::sync::Arc;

use gameshelf_cache::MultiTierCache;
use tokio_util::sync::CancellationToken;

use crate::credential::Credential;
use crate::error::CredentialError;
use crate::issuer::TokenIssuer;

/// Hands out the current access token.
///
/// Lookup order is local tier, remote tier, then a fresh issuance which is
/// written back into both tiers. No retries happen here; the bootstrap
/// pipeline and the refresh scheduler own retry policy.
///
/// Concurrent callers that all miss both tiers each call the issuer. Refresh
/// runs on a multi-minute tick, so the duplicate calls are tolerated rather
/// than collapsed into one.
pub struct CredentialManager {
    cache: Arc<MultiTierCache>,
    issuer: Arc<dyn TokenIssuer>,
    cache_key: String,
}

impl CredentialManager {
    pub fn new(
        cache: Arc<MultiTierCache>,
        issuer: Arc<dyn TokenIssuer>,
        cache_key: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            issuer,
            cache_key: cache_key.into(),
        }
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn cache(&self) -> &Arc<MultiTierCache> {
        &self.cache
    }

    /// Return the current access token, issuing a new one on a full miss.
    ///
    /// # Errors
    ///
    /// Issuer errors are returned untranslated. A failed remote write after
    /// a successful issuance is logged, not returned: the token is valid and
    /// already cached locally.
    pub async fn get_token(&self, cancel: &CancellationToken) -> Result<String, CredentialError> {
        if let Some(token) = self.cache.get_local(&self.cache_key) {
            return Ok(token);
        }

        match self.cache.get_remote(&self.cache_key).await {
            Ok(Some(token)) => return Ok(token),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "remote tier unavailable, requesting a fresh credential");
            }
        }

        let credential = self.issue_fresh(cancel).await?;
        if let Err(e) = self.persist(&credential).await {
            tracing::warn!(error = %e, "credential issued but not stored in the remote tier");
        }
        Ok(credential.access_token)
    }

    /// Call the issuer directly, bypassing both tiers.
    ///
    /// Aborts with [`CredentialError::Cancelled`] as soon as `cancel` fires.
    pub async fn issue_fresh(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Credential, CredentialError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CredentialError::Cancelled),
            result = self.issuer.issue() => result,
        }
    }

    /// Write `credential` into both tiers with its remaining lifetime.
    pub async fn persist(&self, credential: &Credential) -> Result<(), CredentialError> {
        let ttl = credential.remaining();
        if ttl.is_zero() {
            return Err(CredentialError::InvalidResponse(
                "credential expired before it could be stored".to_string(),
            ));
        }
        self.cache
            .set(&self.cache_key, &credential.access_token, ttl)
            .await?;
        tracing::debug!(
            key = %self.cache_key,
            ttl_secs = ttl.as_secs(),
            "credential stored in both tiers"
        );
        Ok(())
    }

    /// Drop the stored credential from both tiers so the next
    /// [`get_token`](Self::get_token) issues a new one.
    pub async fn invalidate(&self) -> Result<(), CredentialError> {
        self.cache.invalidate(&self.cache_key).await?;
        Ok(())
    }
}
