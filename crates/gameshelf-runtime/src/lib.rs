//! Background execution primitives.
//!
//! - [`IntervalScheduler`] - fixed-tick loop with an optional readiness gate
//! - [`BootstrapPipeline`] - strictly ordered startup gates, each retried on
//!   its own cadence until it passes or the process is cancelled
//! - [`probes`] - the network / remote cache / credential gates used at startup
//! - [`CredentialRefreshTask`] - periodic credential refresh work

pub mod bootstrap;
pub mod error;
pub mod gate;
pub mod probes;
pub mod refresh;
pub mod scheduler;

pub use bootstrap::BootstrapPipeline;
pub use error::{BootstrapError, BoxError, SchedulerError};
pub use gate::{FnProbe, ReadinessGate, ReadinessProbe};
pub use probes::{
    CredentialAcquireProbe, CredentialPersistProbe, CredentialSlot, NetworkProbe,
    RemoteCacheProbe, credential_bootstrap,
};
pub use refresh::{CredentialRefreshTask, remote_ready_predicate};
pub use scheduler::{
    IntervalScheduler, ReadinessPredicate, ScheduledTask, SchedulerState, SchedulerStats,
};
