//! Process-local tier.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::entry::{CachedValue, effective_ttl};

/// In-process tier guarded by a single reader/writer lock.
///
/// Reads never block each other; a write excludes every other access to the
/// whole tier. Writes are rare (credential refresh) so per-key locking is not
/// worth it here.
pub struct LocalTier {
    entries: RwLock<HashMap<String, CachedValue>>,
    default_ttl: Duration,
}

impl LocalTier {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .filter(|entry| entry.is_valid_at(now))
            .map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: &str, value: &str, ttl: Duration) {
        let ttl = effective_ttl(ttl, self.default_ttl, "local", key);
        self.entries
            .write()
            .insert(key.to_string(), CachedValue::new(value, ttl));
    }

    pub fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_value_before_expiry() {
        let tier = LocalTier::new(Duration::from_secs(60));
        tier.set("k", "v", Duration::from_secs(60));
        assert_eq!(tier.get("k").as_deref(), Some("v"));
        assert_eq!(tier.get("missing"), None);
    }

    #[test]
    fn expired_entry_reads_as_miss_without_eviction() {
        let tier = LocalTier::new(Duration::from_secs(60));
        tier.set("k", "v", Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(tier.get("k"), None);
        // lazy expiry: the stale entry is still stored
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn zero_ttl_uses_default_instead_of_stale_entry() {
        let tier = LocalTier::new(Duration::from_secs(60));
        tier.set("k", "v", Duration::ZERO);
        assert_eq!(tier.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn remove_drops_entry() {
        let tier = LocalTier::new(Duration::from_secs(60));
        tier.set("k", "v", Duration::from_secs(60));
        tier.remove("k");
        assert!(tier.is_empty());
    }
}
