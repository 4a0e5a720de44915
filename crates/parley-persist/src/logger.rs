use std::fmt::Display;
use std::str::FromStr;

use crate::error::{PersistError, Result};

/// Verbosity of store-level logging
///
/// Ordered: `Error < Info < Debug`. A store emits an event only when the
/// logger is enabled and its level is at least the event's level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Logger handed to every store at construction time
///
/// Thin gate in front of `tracing`: it carries the backend name as a field and
/// filters by the provider's configured verbosity.
#[derive(Debug, Clone)]
pub struct StoreLogger {
    enabled: bool,
    level: LogLevel,
    backend: &'static str,
}

impl StoreLogger {
    pub fn new(enabled: bool, level: LogLevel, backend: &'static str) -> Self {
        Self {
            enabled,
            level,
            backend,
        }
    }

    /// Build from a level name; an unknown name degrades to `error` so that a
    /// misconfigured caller still sees failures but nothing else.
    pub fn with_level_name(enabled: bool, level_name: &str, backend: &'static str) -> Self {
        let level = level_name.parse().unwrap_or(LogLevel::Error);
        Self::new(enabled, level, backend)
    }

    /// Logger that never emits anything
    pub fn disabled(backend: &'static str) -> Self {
        Self::new(false, LogLevel::Error, backend)
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        self.enabled && self.level >= level
    }

    pub fn error(&self, msg: impl Display) {
        if self.enabled(LogLevel::Error) {
            tracing::error!(backend = self.backend, "{}", msg);
        }
    }

    pub fn info(&self, msg: impl Display) {
        if self.enabled(LogLevel::Info) {
            tracing::info!(backend = self.backend, "{}", msg);
        }
    }

    pub fn debug(&self, msg: impl Display) {
        if self.enabled(LogLevel::Debug) {
            tracing::debug!(backend = self.backend, "{}", msg);
        }
    }

    /// Convert a driver result, logging the failure at error level
    pub(crate) fn or_log<T, E>(&self, op: &str, result: std::result::Result<T, E>) -> Result<T>
    where
        E: Into<PersistError>,
    {
        result.map_err(|err| {
            let err = err.into();
            self.error(format!("{op} failed: {err}"));
            err
        })
    }

    pub(crate) fn not_found(&self, entity: &'static str, id: &str) -> PersistError {
        let err = PersistError::not_found(entity, id);
        self.error(&err);
        err
    }
}

/// Short preview of message content for debug listings
pub(crate) fn preview(content: &str) -> String {
    const MAX_CHARS: usize = 50;
    if content.chars().count() > MAX_CHARS {
        let head: String = content.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}
