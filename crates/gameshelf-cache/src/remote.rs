//! Shared (remote) tier contract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::entry::{CachedValue, effective_ttl};
use crate::error::CacheError;

/// Key/value store shared across instances.
///
/// Implementations handle their own expiry; `get_entry` must never return a
/// value whose TTL has elapsed, and its deadline must be the one the store
/// will enforce.
#[async_trait]
pub trait RemoteTier: Send + Sync {
    /// Value together with the deadline the store holds for it.
    async fn get_entry(&self, key: &str) -> Result<Option<CachedValue>, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.get_entry(key).await?.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Round-trip check. A successful ping marks the tier ready.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Whether a ping has succeeded since construction.
    fn is_ready(&self) -> bool;
}

/// Remote tier stand-in that lives in the current process.
///
/// Used when Redis is disabled (single-instance deployments) and in tests.
/// Counts `get` calls so callers can verify tier precedence.
pub struct InMemoryTier {
    entries: RwLock<HashMap<String, CachedValue>>,
    default_ttl: Duration,
    ready: AtomicBool,
    gets: AtomicU64,
}

impl InMemoryTier {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            ready: AtomicBool::new(false),
            gets: AtomicU64::new(0),
        }
    }

    /// Number of reads served so far.
    pub fn get_calls(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RemoteTier for InMemoryTier {
    async fn get_entry(&self, key: &str) -> Result<Option<CachedValue>, CacheError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|entry| entry.is_valid_at(now))
            .cloned())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let ttl = effective_ttl(ttl, self.default_ttl, "remote", key);
        self.entries
            .write()
            .insert(key.to_string(), CachedValue::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn not_ready_until_pinged() {
        let tier = InMemoryTier::new(Duration::from_secs(60));
        assert!(!tier.is_ready());
        tier.ping().await.unwrap();
        assert!(tier.is_ready());
    }

    #[tokio::test]
    async fn set_get_delete() {
        let tier = InMemoryTier::new(Duration::from_secs(60));
        tier.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(tier.get("k").await.unwrap().as_deref(), Some("v"));
        tier.delete("k").await.unwrap();
        assert_eq!(tier.get("k").await.unwrap(), None);
        assert_eq!(tier.get_calls(), 2);
    }

    #[tokio::test]
    async fn entry_carries_remaining_ttl() {
        let tier = InMemoryTier::new(Duration::from_secs(60));
        tier.set("k", "v", Duration::from_secs(5)).await.unwrap();
        let entry = tier.get_entry("k").await.unwrap().unwrap();
        assert_eq!(entry.value, "v");
        assert!(entry.remaining() <= Duration::from_secs(5));
        assert!(entry.remaining() > Duration::from_secs(4));
    }
}
