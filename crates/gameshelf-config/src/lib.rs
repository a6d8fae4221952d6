//! Configuration for the gameshelf background subsystem.
//!
//! Values are read from an optional TOML file and then overridden by
//! environment variables using the `GAMESHELF__SECTION__KEY` convention,
//! e.g. `GAMESHELF__JOBS__WORKERS=5`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "GAMESHELF";

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "gameshelf.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// External credential issuer (client-credentials grant)
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Local/remote cache tier settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Redis remote tier
    #[serde(default)]
    pub redis: RedisConfig,
    /// Startup readiness gates
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    /// Periodic credential refresh
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Deferred work queue
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.jobs.workers == 0 {
            return invalid("jobs.workers must be > 0");
        }
        if self.jobs.capacity == 0 {
            return invalid("jobs.capacity must be > 0");
        }
        if self.jobs.max_retries == 0 {
            return invalid("jobs.max_retries must be > 0");
        }
        if self.bootstrap.network_retry_secs == 0
            || self.bootstrap.cache_retry_secs == 0
            || self.bootstrap.credential_retry_secs == 0
            || self.bootstrap.persist_retry_secs == 0
        {
            return invalid("bootstrap retry intervals must be > 0");
        }
        if self.refresh.interval_secs == 0 {
            return invalid("refresh.interval_secs must be > 0");
        }

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }

        if !self.credentials.issuer_url.is_empty() {
            let parsed = url::Url::parse(&self.credentials.issuer_url).map_err(|e| {
                ConfigError::Invalid(format!("credentials.issuer_url is not a valid URL: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return invalid("credentials.issuer_url must use http or https");
            }
        }

        if self.redis.enabled && self.redis.url.is_empty() {
            return invalid("redis.enabled=true requires redis.url");
        }
        Ok(())
    }
}

/// Client identity presented to the token issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Token endpoint URL. Empty disables the credential machinery.
    #[serde(default)]
    pub issuer_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Key the credential is stored under in both cache tiers
    #[serde(default = "default_credential_cache_key")]
    pub cache_key: String,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_credential_cache_key() -> String {
    "gameshelf:credential".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            issuer_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: None,
            request_timeout_ms: default_request_timeout_ms(),
            cache_key: default_credential_cache_key(),
        }
    }
}

impl CredentialsConfig {
    pub fn is_configured(&self) -> bool {
        !self.issuer_url.is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL used when a remote hit is written back into the local tier
    #[serde(default = "default_local_ttl_secs")]
    pub local_ttl_secs: u64,

    /// TTL substituted when a caller passes a zero TTL
    #[serde(default = "default_default_ttl_secs")]
    pub default_ttl_secs: u64,
}

fn default_local_ttl_secs() -> u64 {
    60
}

fn default_default_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            local_ttl_secs: default_local_ttl_secs(),
            default_ttl_secs: default_default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn local_ttl(&self) -> Duration {
        Duration::from_secs(self.local_ttl_secs)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Redis configuration for the shared remote tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (falls back to an in-process remote tier without it)
    #[serde(default)]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Retry cadence of each startup gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// host:port used for the outbound reachability probe
    #[serde(default = "default_network_probe_addr")]
    pub network_probe_addr: String,
    #[serde(default = "default_network_probe_timeout_ms")]
    pub network_probe_timeout_ms: u64,
    #[serde(default = "default_network_retry_secs")]
    pub network_retry_secs: u64,
    #[serde(default = "default_cache_retry_secs")]
    pub cache_retry_secs: u64,
    #[serde(default = "default_credential_retry_secs")]
    pub credential_retry_secs: u64,
    #[serde(default = "default_persist_retry_secs")]
    pub persist_retry_secs: u64,
}

fn default_network_probe_addr() -> String {
    "1.1.1.1:443".to_string()
}

fn default_network_probe_timeout_ms() -> u64 {
    3000
}

fn default_network_retry_secs() -> u64 {
    30
}

fn default_cache_retry_secs() -> u64 {
    3
}

fn default_credential_retry_secs() -> u64 {
    10
}

fn default_persist_retry_secs() -> u64 {
    3
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            network_probe_addr: default_network_probe_addr(),
            network_probe_timeout_ms: default_network_probe_timeout_ms(),
            network_retry_secs: default_network_retry_secs(),
            cache_retry_secs: default_cache_retry_secs(),
            credential_retry_secs: default_credential_retry_secs(),
            persist_retry_secs: default_persist_retry_secs(),
        }
    }
}

impl BootstrapConfig {
    pub fn network_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.network_probe_timeout_ms)
    }
    pub fn network_retry(&self) -> Duration {
        Duration::from_secs(self.network_retry_secs)
    }
    pub fn cache_retry(&self) -> Duration {
        Duration::from_secs(self.cache_retry_secs)
    }
    pub fn credential_retry(&self) -> Duration {
        Duration::from_secs(self.credential_retry_secs)
    }
    pub fn persist_retry(&self) -> Duration {
        Duration::from_secs(self.persist_retry_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub interval_secs: u64,
}

fn default_refresh_interval_secs() -> u64 {
    240 // 4 minutes
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Base unit of the exponential retry backoff
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

fn default_workers() -> usize {
    3
}

fn default_max_retries() -> u32 {
    3
}

fn default_capacity() -> usize {
    100
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_retries: default_max_retries(),
            capacity: default_capacity(),
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}

impl JobsConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, ConfigError, DEFAULT_CONFIG_FILE, ENV_PREFIX};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., GAMESHELF__JOBS__WORKERS=5
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::Load(format!("config build error: {e}")))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Load(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.jobs.workers, 3);
        assert_eq!(cfg.jobs.max_retries, 3);
        assert_eq!(cfg.jobs.capacity, 100);
        assert_eq!(cfg.bootstrap.network_retry(), Duration::from_secs(30));
        assert_eq!(cfg.bootstrap.cache_retry(), Duration::from_secs(3));
        assert!(!cfg.credentials.is_configured());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_workers() {
        let mut cfg = AppConfig::default();
        cfg.jobs.workers = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("jobs.workers"));
    }

    #[test]
    fn rejects_non_http_issuer() {
        let mut cfg = AppConfig::default();
        cfg.credentials.issuer_url = "ftp://auth.example.com/token".into();
        assert!(cfg.validate().is_err());

        cfg.credentials.issuer_url = "https://auth.example.com/token".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().is_err());
    }
}
