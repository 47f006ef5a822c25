//! Configuration loading for Warden.
//!
//! Configuration is a TOML file whose path comes from `--config <path>` or
//! `WARDEN_CONFIG`. Every section has defaults suitable for a local
//! development setup, a handful of `WARDEN_*` environment variables override
//! file values, and the merged result is validated before use.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

// ============================================================================
// SECTIONS
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct WardenConfig {
    pub cache: CacheStoreConfig,
    pub authority: AuthorityConfig,
    pub resolver: ResolverConfig,
    pub telemetry: TelemetryConfig,
}

/// Connection settings for the Redis cache store.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct CacheStoreConfig {
    /// Redis URL, e.g. `redis://localhost:6379/0`.
    pub url: String,
    /// Per-command response timeout.
    pub response_timeout_ms: u64,
    /// Timeout for establishing (or re-establishing) the connection.
    pub connection_timeout_ms: u64,
    /// Reconnect attempts made by the connection manager after a drop.
    pub reconnect_retries: usize,
    /// Exponential backoff base between reconnect attempts.
    pub reconnect_backoff_base: u64,
    /// Upper bound on a single reconnect delay.
    pub reconnect_max_delay_ms: u64,
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
            response_timeout_ms: 50,
            connection_timeout_ms: 500,
            reconnect_retries: 6,
            reconnect_backoff_base: 2,
            reconnect_max_delay_ms: 2_000,
        }
    }
}

impl CacheStoreConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

/// Connection settings for the remote authority (things service).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct AuthorityConfig {
    /// gRPC endpoint, e.g. `http://things:7000`.
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7000".to_string(),
            connect_timeout_ms: 1_000,
            request_timeout_ms: 1_000,
        }
    }
}

impl AuthorityConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Per-stage time budgets for the resolver.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ResolverConfig {
    /// Upper bound on a cache lookup. Expiry counts as a miss.
    pub cache_timeout_ms: u64,
    /// Upper bound on an authority call. Expiry is a failure.
    pub authority_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_timeout_ms: 50,
            authority_timeout_ms: 1_000,
        }
    }
}

impl ResolverConfig {
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn authority_timeout(&self) -> Duration {
        Duration::from_millis(self.authority_timeout_ms)
    }

    /// Set the cache stage timeout.
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout_ms = duration_to_ms(timeout);
        self
    }

    /// Set the authority stage timeout.
    pub fn with_authority_timeout(mut self, timeout: Duration) -> Self {
        self.authority_timeout_ms = duration_to_ms(timeout);
        self
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct TelemetryConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "warden=info".to_string(),
            json: false,
        }
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// LOADING
// ============================================================================

impl WardenConfig {
    /// Locate, parse, override and validate the configuration.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        Self::load_from(Some(path))
    }

    /// Load from `path`, or `WARDEN_CONFIG`, or built-in defaults when
    /// neither is set. Environment overrides and validation still apply.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match path.or_else(config_path_from_env) {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: WardenConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Apply `WARDEN_*` overrides read through `lookup`.
    ///
    /// Environment variables:
    /// - `WARDEN_CACHE_URL`: Redis URL
    /// - `WARDEN_AUTHORITY_ENDPOINT`: things service gRPC endpoint
    /// - `WARDEN_CACHE_TIMEOUT_MS`: resolver cache stage timeout
    /// - `WARDEN_AUTHORITY_TIMEOUT_MS`: resolver authority stage timeout
    /// - `WARDEN_LOG`: tracing filter directive
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WARDEN_CACHE_URL") {
            self.cache.url = url;
        }
        if let Some(endpoint) = lookup("WARDEN_AUTHORITY_ENDPOINT") {
            self.authority.endpoint = endpoint;
        }
        if let Some(raw) = lookup("WARDEN_CACHE_TIMEOUT_MS") {
            self.resolver.cache_timeout_ms = parse_ms("WARDEN_CACHE_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("WARDEN_AUTHORITY_TIMEOUT_MS") {
            self.resolver.authority_timeout_ms = parse_ms("WARDEN_AUTHORITY_TIMEOUT_MS", &raw)?;
        }
        if let Some(filter) = lookup("WARDEN_LOG") {
            self.telemetry.filter = filter;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.cache.url.trim();
        if url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache.url",
                reason: "must not be empty".to_string(),
            });
        }
        if !["redis://", "rediss://", "unix://", "redis+unix://"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
        {
            return Err(ConfigError::InvalidValue {
                field: "cache.url",
                reason: format!("unsupported scheme in '{}'", url),
            });
        }
        require_positive("cache.response_timeout_ms", self.cache.response_timeout_ms)?;
        require_positive("cache.connection_timeout_ms", self.cache.connection_timeout_ms)?;
        require_positive(
            "cache.reconnect_max_delay_ms",
            self.cache.reconnect_max_delay_ms,
        )?;
        if self.cache.reconnect_backoff_base < 2 {
            return Err(ConfigError::InvalidValue {
                field: "cache.reconnect_backoff_base",
                reason: "must be >= 2".to_string(),
            });
        }

        let endpoint = self.authority.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "authority.endpoint",
                reason: "must not be empty".to_string(),
            });
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "authority.endpoint",
                reason: format!("expected http:// or https://, got '{}'", endpoint),
            });
        }
        require_positive("authority.connect_timeout_ms", self.authority.connect_timeout_ms)?;
        require_positive("authority.request_timeout_ms", self.authority.request_timeout_ms)?;

        require_positive("resolver.cache_timeout_ms", self.resolver.cache_timeout_ms)?;
        require_positive(
            "resolver.authority_timeout_ms",
            self.resolver.authority_timeout_ms,
        )?;

        if self.telemetry.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "telemetry.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn require_positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be > 0".to_string(),
        });
    }
    Ok(())
}

fn parse_ms(field: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field,
        reason: format!("'{}' is not a whole number of milliseconds", raw),
    })
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("WARDEN_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
