use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PersistError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(feature = "sql")]
impl From<sqlx::Error> for PersistError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(db_err.message().to_string())
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for PersistError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<config::ConfigError> for PersistError {
    fn from(err: config::ConfigError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
