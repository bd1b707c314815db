//! Error types for dogether
//!
//! Every failure belongs to one [`ErrorKind`]; callers classify on the kind,
//! never on the message text.
//!
//! Exit codes:
//! - 0: Success
//! - 2: Invalid argument or configuration
//! - 3: Access denied
//! - 4: Referenced user, list or task not found
//! - 5: Conflict (relationship precondition, duplicate username)
//! - 6: Storage failure (I/O, encoding, lock timeout)

use thiserror::Error;

/// Exit codes for the dogether CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_ARGUMENT: i32 = 2;
    pub const ACCESS_DENIED: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 5;
    pub const STORAGE_FAILED: i32 = 6;
}

/// Stable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    AccessDenied,
    InvalidArgument,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Storage => "storage_error",
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::InvalidArgument => exit_codes::INVALID_ARGUMENT,
            ErrorKind::AccessDenied => exit_codes::ACCESS_DENIED,
            ErrorKind::NotFound => exit_codes::NOT_FOUND,
            ErrorKind::Conflict => exit_codes::CONFLICT,
            ErrorKind::Storage => exit_codes::STORAGE_FAILED,
        }
    }
}

/// Main error type for dogether operations
#[derive(Error, Debug)]
pub enum Error {
    // Not found
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("List not found: {0}")]
    ListNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    // Conflicts
    #[error("Conflict: {0}")]
    Conflict(String),

    // Authorization
    #[error("Access denied: {0}")]
    AccessDenied(String),

    // Bad input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Storage failures
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(String),

    #[error("Storage failed: {0}")]
    StorageFailed(String),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UserNotFound(_) | Error::ListNotFound(_) | Error::TaskNotFound(_) => {
                ErrorKind::NotFound
            }

            Error::Conflict(_) => ErrorKind::Conflict,

            Error::AccessDenied(_) => ErrorKind::AccessDenied,

            Error::InvalidArgument(_) | Error::InvalidConfig(_) => ErrorKind::InvalidArgument,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::StorageFailed(_) => ErrorKind::Storage,
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    /// Structured details for machine-readable output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::UserNotFound(id) => Some(serde_json::json!({ "user": id })),
            Error::ListNotFound(id) => Some(serde_json::json!({ "list": id })),
            Error::TaskNotFound(id) => Some(serde_json::json!({ "task": id })),
            Error::LockFailed(path) => Some(serde_json::json!({ "lock": path })),
            _ => None,
        }
    }
}

/// Result type alias for dogether operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    #[serde(rename = "message")]
    pub error: String,
    pub code: i32,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
