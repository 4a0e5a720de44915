use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;

use crate::error::{PersistError, Result};
use crate::logger::{LogLevel, StoreLogger};

/// Storage engine family behind a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// SQL engine with joins and transactions (MySQL, SQLite)
    Relational,
    /// Key/value engine with sorted sets and sets (Redis, in-process memory)
    KeyValue,
}

impl BackendKind {
    /// Parse a configured kind; an empty string selects the relational backend.
    pub fn parse(kind: &str) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "" | "mysql" | "sqlite" | "sql" | "relational" => Ok(Self::Relational),
            "redis" | "kv" | "key_value" | "memory" => Ok(Self::KeyValue),
            other => Err(PersistError::UnsupportedBackend(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::KeyValue => "key_value",
        }
    }
}

impl FromStr for BackendKind {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Sizing of the relational connection pool
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            min_connections: 10,
            max_lifetime_secs: 3600,
            idle_timeout_secs: 600,
            acquire_timeout_secs: 30,
        }
    }
}

impl PoolConfig {
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Runtime configuration consumed by the provider factory
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    pub connection_string: String,
    /// Backend name (`mysql`, `sqlite`, `redis`, `memory`, ...); empty means relational
    #[serde(default)]
    pub backend_kind: String,
    #[serde(default)]
    pub debug_enabled: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub pool: PoolConfig,
}

fn default_log_level() -> String {
    LogLevel::default().as_str().to_string()
}

impl ProviderConfig {
    pub fn new(connection_string: impl Into<String>, backend_kind: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            backend_kind: backend_kind.into(),
            debug_enabled: false,
            log_level: default_log_level(),
            pool: PoolConfig::default(),
        }
    }

    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn kind(&self) -> Result<BackendKind> {
        BackendKind::parse(&self.backend_kind)
    }

    /// Store logger for a backend, honoring `debug_enabled` and `log_level`
    pub fn logger(&self, backend: &'static str) -> StoreLogger {
        let level = if self.log_level.trim().is_empty() {
            LogLevel::default().as_str()
        } else {
            self.log_level.as_str()
        };
        StoreLogger::with_level_name(self.debug_enabled, level, backend)
    }

    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/parley.toml
    /// 2. config/parley.{ENV}.toml (if ENV is set)
    /// 3. Environment variables prefixed with `PARLEY_` (`PARLEY_POOL__MAX_CONNECTIONS`)
    pub fn load() -> Result<Self> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/parley").required(false))
            .add_source(File::with_name(&format!("config/parley.{}", env)).required(false))
            .add_source(
                Environment::with_prefix("PARLEY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
