//! Process-wide tracing subscriber with a filter that can be narrowed once
//! the configuration file has been read.

use anyhow::Context;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Handle on the installed subscriber's filter.
pub struct Telemetry {
    filter: reload::Handle<EnvFilter, Registry>,
    /// Set when `RUST_LOG` supplied the filter; config levels are then ignored.
    pinned: bool,
}

impl Telemetry {
    /// Install the global subscriber starting at `default_level`.
    ///
    /// A parseable `RUST_LOG` takes precedence and pins the filter.
    pub fn install(default_level: &str) -> Self {
        let rust_log = std::env::var("RUST_LOG").ok();
        let (layer, telemetry) = Self::filter_layer(default_level, rust_log.as_deref());

        if tracing_subscriber::registry()
            .with(layer)
            .with(fmt::layer().with_target(true))
            .try_init()
            .is_err()
        {
            eprintln!("Warning: a global tracing subscriber was already installed");
        }
        telemetry
    }

    fn filter_layer(
        default_level: &str,
        rust_log: Option<&str>,
    ) -> (reload::Layer<EnvFilter, Registry>, Self) {
        let from_env = rust_log.and_then(|directives| EnvFilter::try_new(directives).ok());
        let pinned = from_env.is_some();
        let filter = from_env
            .or_else(|| EnvFilter::try_new(default_level).ok())
            .unwrap_or_else(|| EnvFilter::new("info"));

        let (layer, handle) = reload::Layer::new(filter);
        (
            layer,
            Self {
                filter: handle,
                pinned,
            },
        )
    }

    /// Switch to the configured `level` (any `EnvFilter` directive string).
    ///
    /// No-op while `RUST_LOG` pins the filter. An unparseable level leaves
    /// the current filter in place and is returned as an error.
    pub fn apply_level(&self, level: &str) -> anyhow::Result<()> {
        if self.pinned {
            tracing::debug!(level, "RUST_LOG is set, ignoring configured log level");
            return Ok(());
        }
        let filter = EnvFilter::try_new(level)
            .with_context(|| format!("invalid logging.level {level:?}"))?;
        self.filter
            .reload(filter)
            .context("tracing subscriber is gone")?;
        tracing::debug!(level, "log level applied");
        Ok(())
    }

    /// Directives of the active filter.
    pub fn current_filter(&self) -> anyhow::Result<String> {
        self.filter
            .with_current(|filter| filter.to_string())
            .context("tracing subscriber is gone")
    }
}
