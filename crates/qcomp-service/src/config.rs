//! Configuration management for the qcomp server.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with QCOMP_ prefix)
//! 3. .env files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatcher::{DispatcherConfig, default_workers};
use crate::tracing_config::LogFormat;

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub dispatcher: DispatcherSettings,
    pub storage: StorageConfig,
    pub observability: ObservabilityConfig,
    pub retention: RetentionConfig,
}

/// HTTP server settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0"
    pub bind: String,
    pub port: u16,
    /// Comma-separated allowed origins or `*`. `None` disables CORS.
    pub cors_origins: Option<String>,
    /// Bearer token required on API routes (set via QCOMP_API_KEY)
    pub api_key: Option<String>,
    /// Ceiling on any single request, including blocking waits
    pub request_timeout_seconds: u64,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("cors_origins", &self.cors_origins)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: None,
            api_key: None,
            request_timeout_seconds: 3600,
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    pub workers: usize,
    /// Must stay below `server.request_timeout_seconds`
    pub compile_timeout_seconds: u64,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            compile_timeout_seconds: 3300,
        }
    }
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Jobs are lost on restart; for tests and development.
    Memory,
    #[default]
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

/// Database file used when none is configured.
pub const DEFAULT_STORAGE_PATH: &str = "qcomp-jobs.db";

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database file for the sqlite backend
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: Some(PathBuf::from(DEFAULT_STORAGE_PATH)),
        }
    }
}

/// Logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// "trace", "debug", "info", "warn" or "error"
    pub log_level: String,
    pub log_format: LogFormat,
    /// Serve /metrics
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Console,
            metrics_enabled: true,
        }
    }
}

/// Cleanup of finished jobs. Disabled unless `hours` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Delete terminal jobs this many hours after they finished
    pub hours: Option<u64>,
    pub sweep_interval_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            hours: None,
            sweep_interval_seconds: 600,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml_ng::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration with the following precedence:
    /// 1. Load .env file if it exists
    /// 2. Load from file if provided, else defaults
    /// 3. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        let config = config.merge_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `QCOMP_*` overrides read through `lookup`.
    ///
    /// Only variables that are set override the current values.
    pub fn merge_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError>
        where
            T::Err: fmt::Display,
        {
            value
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("{key}={value}: {e}")))
        }

        // Server
        if let Some(v) = lookup("QCOMP_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("QCOMP_PORT") {
            self.server.port = parsed("QCOMP_PORT", v)?;
        }
        if let Some(v) = lookup("QCOMP_CORS_ORIGINS") {
            self.server.cors_origins = Some(v);
        }
        if let Some(v) = lookup("QCOMP_API_KEY") {
            self.server.api_key = Some(v);
        }
        if let Some(v) = lookup("QCOMP_REQUEST_TIMEOUT") {
            self.server.request_timeout_seconds = parsed("QCOMP_REQUEST_TIMEOUT", v)?;
        }

        // Dispatcher
        if let Some(v) = lookup("QCOMP_WORKERS") {
            self.dispatcher.workers = parsed("QCOMP_WORKERS", v)?;
        }
        if let Some(v) = lookup("QCOMP_COMPILE_TIMEOUT") {
            self.dispatcher.compile_timeout_seconds = parsed("QCOMP_COMPILE_TIMEOUT", v)?;
        }

        // Storage
        if let Some(v) = lookup("QCOMP_STORAGE") {
            self.storage.backend = parsed("QCOMP_STORAGE", v)?;
        }
        if let Some(v) = lookup("QCOMP_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(v));
        }

        // Observability
        if let Some(v) = lookup("QCOMP_LOG_LEVEL") {
            self.observability.log_level = v;
        }
        if let Some(v) = lookup("QCOMP_LOG_FORMAT") {
            self.observability.log_format = parsed("QCOMP_LOG_FORMAT", v)?;
        }
        if let Some(v) = lookup("QCOMP_METRICS_ENABLED") {
            self.observability.metrics_enabled = parsed("QCOMP_METRICS_ENABLED", v)?;
        }

        // Retention
        if let Some(v) = lookup("QCOMP_RETENTION_HOURS") {
            self.retention.hours = Some(parsed("QCOMP_RETENTION_HOURS", v)?);
        }

        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.dispatcher.workers == 0 {
            return Err(ConfigError::ValidationError(
                "dispatcher.workers must be greater than 0".to_string(),
            ));
        }

        if self.dispatcher.compile_timeout_seconds >= self.server.request_timeout_seconds {
            return Err(ConfigError::ValidationError(format!(
                "dispatcher.compile_timeout_seconds ({}) must be below server.request_timeout_seconds ({})",
                self.dispatcher.compile_timeout_seconds, self.server.request_timeout_seconds
            )));
        }

        if self.storage.backend == StorageBackend::Sqlite && self.storage.path.is_none() {
            return Err(ConfigError::ValidationError(
                "storage.path is required for the sqlite backend".to_string(),
            ));
        }

        match self.observability.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        if let Some(ref key) = self.server.api_key {
            if key.is_empty() {
                return Err(ConfigError::ValidationError(
                    "api_key must not be empty; omit the field to disable authentication"
                        .to_string(),
                ));
            }
        }

        if self.retention.hours.is_some() && self.retention.sweep_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "retention.sweep_interval_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.server.bind.parse().map_err(|_| {
            ConfigError::ValidationError(format!("Invalid bind address: {}", self.server.bind))
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig::new(
            self.dispatcher.workers,
            Duration::from_secs(self.dispatcher.compile_timeout_seconds),
        )
    }

    /// Age after which finished jobs are purged, if retention is enabled.
    pub fn retention_period(&self) -> Option<Duration> {
        self.retention
            .hours
            .map(|h| Duration::from_secs(h.saturating_mul(3600)))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
