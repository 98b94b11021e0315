//! Core error types for focustrack-core.
//!
//! Every collaborator has its own error enum so call sites can decide which
//! failures are fatal. The session flow itself only ever logs storage,
//! remote and notification failures.

use std::path::PathBuf;
use thiserror::Error;

/// Local session store errors.
#[derive(Error, Debug)]
pub enum StorageError {
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

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be decoded
    #[error("Corrupt session row '{id}': {message}")]
    CorruptRow { id: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(#[source] std::io::Error),
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Remote mirror errors.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Endpoint could not be parsed or joined
    #[error("Invalid mirror endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// Transport-level failure
    #[error("Mirror request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Mirror rejected session (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Account errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Email already registered
    #[error("An account for {0} already exists")]
    AlreadyRegistered(String),

    /// No account for the given email
    #[error("No account registered for {0}")]
    NotRegistered(String),

    /// Email is not plausibly an address
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Account book could not be read or written
    #[error("Account book at {path}: {message}")]
    Book { path: PathBuf, message: String },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Session started without a category
    #[error("Please select a category before starting a session")]
    MissingCategory,

    /// Session duration must be at least one minute
    #[error("Session duration must be at least 1 minute (got {0})")]
    ZeroDuration(u32),

    /// Unknown category label
    #[error("Unknown category '{0}' (expected study, coding, project or reading)")]
    UnknownCategory(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StorageError::Locked
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}
