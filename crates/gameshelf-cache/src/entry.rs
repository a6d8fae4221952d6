use std::time::{Duration, Instant};

/// A value held by exactly one tier, with that tier's own deadline.
#[derive(Clone, Debug)]
pub struct CachedValue {
    pub value: String,
    pub expires_at: Instant,
}

impl CachedValue {
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    /// Valid only when read strictly before the deadline.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Replaces a zero TTL with `default` so no write produces an entry that is
/// stale on arrival.
pub(crate) fn effective_ttl(ttl: Duration, default: Duration, tier: &str, key: &str) -> Duration {
    if ttl.is_zero() {
        tracing::warn!(
            tier,
            key = %key,
            default_ttl_secs = default.as_secs(),
            "zero TTL requested, substituting default"
        );
        default
    } else {
        ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_strictly_before_deadline() {
        let entry = CachedValue::new("tok", Duration::from_secs(10));
        assert!(entry.is_valid_at(entry.expires_at - Duration::from_millis(1)));
        assert!(!entry.is_valid_at(entry.expires_at));
        assert!(!entry.is_valid_at(entry.expires_at + Duration::from_secs(1)));
    }

    #[test]
    fn remaining_counts_down_to_zero() {
        let entry = CachedValue::new("tok", Duration::from_secs(10));
        assert!(entry.remaining() <= Duration::from_secs(10));
        assert!(entry.remaining() > Duration::from_secs(9));

        let past = CachedValue {
            value: "tok".into(),
            expires_at: Instant::now() - Duration::from_millis(1),
        };
        assert_eq!(past.remaining(), Duration::ZERO);
    }

    #[test]
    fn zero_ttl_is_replaced() {
        let default = Duration::from_secs(300);
        assert_eq!(effective_ttl(Duration::ZERO, default, "local", "k"), default);
        assert_eq!(
            effective_ttl(Duration::from_secs(5), default, "local", "k"),
            Duration::from_secs(5)
        );
    }
}
