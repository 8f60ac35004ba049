//! Core error types for breakdown-core.
//!
//! Every module reports failures through a `thiserror` enum; they all fold
//! into [`CoreError`] so callers can use a single `Result` alias.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breakdown-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session clock rejected an operation
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task list errors
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// Music playback collaborator errors
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors signalled by the session clock.
///
/// None of these leave the clock in a modified state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// A configured duration was zero.
    #[error("Invalid durations: work={work}s short_break={short_break}s long_break={long_break}s (all must be positive)")]
    InvalidConfig {
        work: u64,
        short_break: u64,
        long_break: u64,
    },

    /// `resume` was called with no time left on the clock.
    #[error("Nothing to resume: no time remaining")]
    NothingToResume,

    /// The driver task has shut down.
    #[error("Clock driver is no longer running")]
    DriverClosed,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be created
    #[error("Cannot prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Task list errors.
#[derive(Error, Debug)]
pub enum TaskError {
    /// No task with this id for the user
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Underlying store failed
    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// Music playback collaborator errors.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Playback integration is disabled or missing settings
    #[error("Playback not configured: {0}")]
    NotConfigured(String),

    /// No tokens stored for this user
    #[error("Not connected to the playback service for user '{user}'")]
    NotConnected { user: String },

    /// The user declined authorization
    #[error("Authorization denied: {0}")]
    Denied(String),

    /// HTTP transport failure
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote service answered with a non-success status
    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not contain what we expected
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid URL in configuration
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Token storage failed
    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Empty value where text is required
    #[error("Empty value for '{0}'")]
    Empty(String),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for TaskError {
    fn from(err: rusqlite::Error) -> Self {
        TaskError::Store(err.into())
    }
}

impl From<rusqlite::Error> for PlaybackError {
    fn from(err: rusqlite::Error) -> Self {
        PlaybackError::Store(err.into())
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }

    #[test]
    fn clock_error_folds_into_core_error() {
        let err: CoreError = ClockError::NothingToResume.into();
        assert_eq!(err.to_string(), "Clock error: Nothing to resume: no time remaining");
    }
}
