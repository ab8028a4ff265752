//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid host/port combination: {0}")]
    InvalidSocketAddr(String),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("AI base URL must start with http:// or https://")]
    InvalidAiBaseUrl,

    #[error("AI temperature must be between 0 and 2")]
    InvalidTemperature,

    #[error("AI max_retries must be at most {0}")]
    TooManyRetries(u32),

    #[error("Capability timeout must be between 1 and 600 seconds")]
    InvalidCapabilityTimeout,

    #[error("Event buffer must hold at least one event")]
    InvalidEventBuffer,

    #[error("Opening {0} must not be blank")]
    BlankOpening(&'static str),
}
