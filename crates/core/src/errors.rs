//! Error types for the trackmigrate core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

// ---------------------------------------------------------------------------
// Tracker API errors
// ---------------------------------------------------------------------------

/// Errors from tracker REST API interactions.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// HTTP-level transport error (network, TLS, timeout).
    #[error("tracker HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("tracker API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// API token is missing or was rejected.
    #[error("tracker authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The remote API throttled us.
    #[error("tracker rate limit exceeded, retry after {retry_after}")]
    RateLimited { retry_after: String },

    /// The target already holds an equivalent entity.
    #[error("{entity} already exists: {detail}")]
    Duplicate { entity: String, detail: String },

    /// JSON (de)serialization failure.
    #[error("tracker response parse error: {0}")]
    ParseError(String),
}

impl TrackerError {
    /// Whether this failure means the create was already satisfied.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Migration errors
// ---------------------------------------------------------------------------

/// Errors from the migration orchestrator.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Underlying tracker error.
    #[error("migration tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// A pipeline stage was entered out of order.
    #[error("invalid migration stage transition from {from} to {to}")]
    InvalidStageTransition { from: String, to: String },

    /// A stage was entered before a stage it depends on completed.
    #[error("migration stage {stage} requires {requires} to complete first")]
    MissingPrerequisite { stage: String, requires: String },

    /// A plan asked for a project-scoped operation without a project.
    #[error("migration plan is missing {0}")]
    MissingScope(String),
}
