//! Two-tier cache used for the externally issued credential.
//!
//! ## Architecture
//!
//! - **Local tier**: in-process map, no network cost, per instance
//! - **Remote tier**: shared store (Redis, or an in-process stand-in when
//!   Redis is disabled), consulted only on a local miss
//!
//! ```text
//! get → local ──miss──→ remote ──hit──→ write back to local (short TTL)
//! ```
//!
//! Expiry is lazy: an entry past its deadline reads as a miss and is never
//! evicted explicitly.

pub mod entry;
pub mod error;
pub mod local;
pub mod multi_tier;
pub mod redis;
pub mod remote;

pub use entry::CachedValue;
pub use error::CacheError;
pub use local::LocalTier;
pub use multi_tier::{CacheStats, MultiTierCache};
pub use redis::RedisTier;
pub use remote::{InMemoryTier, RemoteTier};
