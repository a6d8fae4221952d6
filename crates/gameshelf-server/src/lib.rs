pub mod app;
pub mod cli;
pub mod handlers;
pub mod observability;

pub use app::{App, shutdown_signal};
pub use observability::Telemetry;
