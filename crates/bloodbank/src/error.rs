//! Error types for bloodbank.
//!
//! This module defines all error types used throughout the bloodbank crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::DonorStatus;
use crate::session::Role;

/// The main error type for bloodbank operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Form and Workflow Errors ===
    /// A submitted form field failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row that was looked up.
        entity: &'static str,
        /// Identifier that was looked up.
        id: i64,
    },

    /// A donor is not in the status the requested action needs.
    #[error("cannot {action} donor {donor_id}: current status is '{status}'")]
    InvalidTransition {
        /// The donor the action targeted.
        donor_id: i64,
        /// The attempted action.
        action: &'static str,
        /// The status the donor actually has.
        status: DonorStatus,
    },

    /// A blood request is not in a status that allows the requested change.
    #[error("cannot {action} request {request_id}: current status is '{status}'")]
    InvalidRequestTransition {
        /// The request that was targeted.
        request_id: i64,
        /// The attempted action.
        action: &'static str,
        /// The status the request actually has.
        status: String,
    },

    // === Auth Errors ===
    /// Username or password did not match.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// No session is active (never signed in, or signed out).
    #[error("not signed in; run `bbank login` first")]
    SessionMissing,

    /// The session passed its expiry and was discarded.
    #[error("session expired; sign in again")]
    SessionExpired,

    /// The session's role does not allow the operation.
    #[error("permission denied: {operation} requires the {required} role")]
    PermissionDenied {
        /// The operation that was refused.
        operation: &'static str,
        /// The role that would have been accepted.
        required: Role,
    },

    /// An operator with the same username already exists.
    #[error("operator '{username}' already exists")]
    OperatorExists {
        /// The duplicated username.
        username: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for bloodbank operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error for a form field.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Create a permission error.
    #[must_use]
    pub fn permission_denied(operation: &'static str, required: Role) -> Self {
        Self::PermissionDenied {
            operation,
            required,
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from form validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error is an authentication or authorization problem.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::SessionMissing
                | Self::SessionExpired
                | Self::PermissionDenied { .. }
        )
    }
}
