//! Redis-backed remote tier.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Connection, Pool, PoolConfig, Runtime};

use crate::entry::{CachedValue, effective_ttl};
use crate::error::CacheError;
use crate::remote::RemoteTier;

/// Remote tier over a pooled Redis connection.
///
/// TTLs are enforced by Redis itself (`SET EX`), so expired keys simply come
/// back as `nil`. Reads fetch `PTTL` alongside the value so callers see the
/// deadline Redis holds.
pub struct RedisTier {
    pool: Pool,
    default_ttl: Duration,
    ready: AtomicBool,
}

impl RedisTier {
    pub fn new(pool: Pool, default_ttl: Duration) -> Self {
        Self {
            pool,
            default_ttl,
            ready: AtomicBool::new(false),
        }
    }

    /// Build the connection pool. No connection is attempted here; readiness
    /// is established later by [`RemoteTier::ping`].
    pub fn connect(
        url: &str,
        pool_size: usize,
        timeout: Duration,
        default_ttl: Duration,
    ) -> Result<Self, CacheError> {
        let mut redis_config = deadpool_redis::Config::from_url(url);
        let mut pool_config = PoolConfig::new(pool_size);
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!(url = %url, pool_size, "Redis pool created");
        Ok(Self::new(pool, default_ttl))
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool.get().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to get Redis connection");
            CacheError::Connection(e.to_string())
        })
    }
}

#[async_trait]
impl RemoteTier for RedisTier {
    async fn get_entry(&self, key: &str) -> Result<Option<CachedValue>, CacheError> {
        let mut conn = self.conn().await?;
        let (value, pttl): (Option<String>, i64) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(key)
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                tracing::warn!(key = %key, error = %e, "Redis GET error");
                CacheError::Command(e.to_string())
            })?;
        Ok(value.and_then(|value| {
            remaining_from_pttl(pttl, self.default_ttl).map(|ttl| CachedValue {
                value,
                expires_at: Instant::now() + ttl,
            })
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let ttl = effective_ttl(ttl, self.default_ttl, "remote", key);
        // SET EX has second granularity and rejects 0
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| {
                tracing::warn!(key = %key, error = %e, "Redis SET error");
                CacheError::Command(e.to_string())
            })?;
        tracing::debug!(key = %key, ttl_secs, "remote cache set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis DEL error");
            CacheError::Command(e.to_string())
        })
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;
        if pong != "PONG" {
            return Err(CacheError::Command(format!("unexpected PING reply: {pong}")));
        }
        if !self.ready.swap(true, Ordering::AcqRel) {
            tracing::info!("Redis tier ready");
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Maps a `PTTL` reply to the time left on the key.
///
/// `-1` means the key has no expiry and is capped at `default`; `-2` (gone)
/// and `0` read as a miss.
fn remaining_from_pttl(pttl: i64, default: Duration) -> Option<Duration> {
    match pttl {
        -1 => Some(default),
        ms => u64::try_from(ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pttl_maps_to_remaining() {
        let default = Duration::from_secs(300);
        assert_eq!(
            remaining_from_pttl(1500, default),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(remaining_from_pttl(-1, default), Some(default));
        assert_eq!(remaining_from_pttl(-2, default), None);
        assert_eq!(remaining_from_pttl(0, default), None);
    }
}
