use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Kind of deferred work; selects the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Notify a user about an event on their collection
    Notification,
    /// A wishlist entry dropped below its target price
    WishlistAlert,
    /// Recompute cached dashboard aggregates for one owner
    DashboardRefresh,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::WishlistAlert => "wishlist_alert",
            Self::DashboardRefresh => "dashboard_refresh",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of deferred work. Lives only in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub kind: JobKind,

    /// Owner the work is performed for (e.g. a user id)
    pub owner_key: String,

    /// Handler-specific data
    pub payload: HashMap<String, serde_json::Value>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Attempts made so far; incremented once per processing
    pub attempt: u32,
}

impl WorkItem {
    pub fn new(kind: JobKind, owner_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            owner_key: owner_key.into(),
            payload: HashMap::new(),
            created_at: OffsetDateTime::now_utc(),
            attempt: 0,
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

/// Queue counters. Each item ends in exactly one of `completed`,
/// `exhausted` or `dropped`, unless it was still buffered at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub enqueued: u64,
    pub completed: u64,
    pub retried: u64,
    pub exhausted: u64,
    pub dropped: u64,
    pub rejected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_item_starts_at_attempt_zero() {
        let item = WorkItem::new(JobKind::WishlistAlert, "user-1")
            .with_payload("game_id", json!(42));
        assert_eq!(item.attempt, 0);
        assert_eq!(item.owner_key, "user-1");
        assert_eq!(item.payload["game_id"], json!(42));
        assert!(Uuid::parse_str(&item.id).is_ok());
    }

    #[test]
    fn kind_serializes_as_snake_case() {
        let item = WorkItem::new(JobKind::DashboardRefresh, "user-2");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["kind"], "dashboard_refresh");
        assert_eq!(JobKind::WishlistAlert.to_string(), "wishlist_alert");
    }
}
