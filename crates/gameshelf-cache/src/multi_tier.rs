//! Local + remote read path for a single credential key.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::entry::effective_ttl;
use crate::error::CacheError;
use crate::local::LocalTier;
use crate::remote::RemoteTier;

/// Two-tier cache: local tier first, remote tier on a local miss.
///
/// A remote hit is written back into the local tier so later reads on this
/// instance skip the network. The local copy lives for `write_back_ttl` or
/// until the remote entry's own deadline, whichever comes first. This type holds no refresh
/// logic; a miss in both tiers is the caller's problem.
pub struct MultiTierCache {
    local: LocalTier,
    remote: Arc<dyn RemoteTier>,
    write_back_ttl: Duration,
    default_ttl: Duration,
    local_hits: AtomicU64,
    remote_hits: AtomicU64,
    misses: AtomicU64,
    remote_errors: AtomicU64,
}

impl MultiTierCache {
    /// # Arguments
    ///
    /// * `remote` - shared tier (Redis or [`InMemoryTier`](crate::InMemoryTier))
    /// * `write_back_ttl` - TTL given to values promoted from remote to local
    /// * `default_ttl` - substituted whenever a caller passes a zero TTL
    pub fn new(remote: Arc<dyn RemoteTier>, write_back_ttl: Duration, default_ttl: Duration) -> Self {
        Self {
            local: LocalTier::new(default_ttl),
            remote,
            write_back_ttl: effective_ttl(write_back_ttl, default_ttl, "local", "<write-back>"),
            default_ttl,
            local_hits: AtomicU64::new(0),
            remote_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            remote_errors: AtomicU64::new(0),
        }
    }

    /// Look up `key` in the local tier, then the remote tier.
    ///
    /// A remote failure is logged and reported as a miss so a flaky shared
    /// store degrades to "fetch a fresh value" instead of an error.
    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.get_local(key) {
            return Some(value);
        }
        match self.get_remote(key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "remote tier read failed, treating as miss");
                None
            }
        }
    }

    /// Local tier only; never touches the network.
    pub fn get_local(&self, key: &str) -> Option<String> {
        let value = self.local.get(key);
        if value.is_some() {
            self.local_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "cache hit (local)");
        }
        value
    }

    /// Remote tier only. A hit is written back into the local tier, never
    /// outliving the remote copy.
    pub async fn get_remote(&self, key: &str) -> Result<Option<String>, CacheError> {
        let found = self.remote.get_entry(key).await.map(|entry| {
            entry
                .map(|entry| {
                    let remaining = entry.remaining();
                    (entry.value, remaining)
                })
                .filter(|(_, remaining)| !remaining.is_zero())
        });
        match found {
            Ok(Some((value, remaining))) => {
                let ttl = self.write_back_ttl.min(remaining);
                self.remote_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    key = %key,
                    write_back_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
                    "cache hit (remote), writing back to local"
                );
                self.local.set(key, &value, ttl);
                Ok(Some(value))
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "cache miss");
                Ok(None)
            }
            Err(e) => {
                self.remote_errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Write `value` into both tiers, each with its own copy and TTL.
    ///
    /// The local write always happens; the remote result is returned so the
    /// caller can decide whether a partial write matters.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let ttl = effective_ttl(ttl, self.default_ttl, "multi", key);
        self.set_local(key, value, ttl.min(self.write_back_ttl));
        self.set_remote(key, value, ttl).await
    }

    pub fn set_local(&self, key: &str, value: &str, ttl: Duration) {
        self.local.set(key, value, ttl);
    }

    pub async fn set_remote(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.remote.set(key, value, ttl).await.inspect_err(|_| {
            self.remote_errors.fetch_add(1, Ordering::Relaxed);
        })
    }

    /// Remove `key` from both tiers.
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.local.remove(key);
        self.remote.delete(key).await?;
        tracing::debug!(key = %key, "cache invalidated (local+remote)");
        Ok(())
    }

    /// Ping the remote tier; `true` once it answered.
    pub async fn ping_remote(&self) -> bool {
        match self.remote.ping().await {
            Ok(()) => self.remote.is_ready(),
            Err(e) => {
                tracing::debug!(error = %e, "remote tier ping failed");
                false
            }
        }
    }

    /// Readiness flag of the remote tier without a round trip.
    pub fn remote_ready(&self) -> bool {
        self.remote.is_ready()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            local_entries: self.local.len(),
            local_hits: self.local_hits.load(Ordering::Relaxed),
            remote_hits: self.remote_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub local_entries: usize,
    pub local_hits: u64,
    pub remote_hits: u64,
    pub misses: u64,
    pub remote_errors: u64,
}
