//! Error types for SMD.

use thiserror::Error;

use crate::auth::{AclError, PasswordError, PrivilegeError, SessionError};

/// Common error type for SMD.
#[derive(Error, Debug)]
pub enum SmdError {
    /// Declared or actual upload size exceeds the configured ceiling.
    #[error("payload too large: {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge {
        /// Bytes declared or counted so far.
        size: u64,
        /// Configured ceiling.
        max: u64,
    },

    /// The request body carries no file field.
    #[error("no file in request body")]
    MissingFile,

    /// The request carries no body at all.
    #[error("request body empty")]
    EmptyBody,

    /// Reading or repositioning the upload while computing its digest failed.
    #[error("hash failure: {0}")]
    Hash(#[source] std::io::Error),

    /// Creating or writing the blob failed.
    #[error("storage failure: {0}")]
    Storage(#[source] std::io::Error),

    /// Catalog insert/update/delete failed after the blob was stored.
    #[error("metadata failure: {0}")]
    Metadata(String),

    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A record with the same unique key already exists.
    #[error("{0} already exists")]
    Conflict(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Privilege check failed.
    #[error(transparent)]
    Privilege(#[from] PrivilegeError),

    /// Access-control list membership error.
    #[error(transparent)]
    Acl(#[from] AclError),

    /// Session registry error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Password hashing or verification error.
    #[error(transparent)]
    Password(#[from] PasswordError),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for SmdError {
    fn from(e: sqlx::Error) -> Self {
        SmdError::Database(e.to_string())
    }
}

/// Result type alias for SMD operations.
pub type Result<T> = std::result::Result<T, SmdError>;
