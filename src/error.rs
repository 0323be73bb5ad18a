//! Error types for weekplan
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, bad config)
//! - 4: Operation failed (I/O, serialization, locking)
//!
//! Missing block/step/card/subtask ids are not errors. Model mutations
//! report them as "nothing changed" instead.

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the weekplan CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for weekplan operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid week: {0}")]
    InvalidWeek(String),

    #[error("Task not found in week {week}: {id}")]
    TaskNotFound { week: String, id: String },

    #[error("Ambiguous task id '{prefix}' matches {count} tasks")]
    AmbiguousTaskId { prefix: String, count: usize },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::InvalidWeek(_)
            | Error::TaskNotFound { .. }
            | Error::AmbiguousTaskId { .. } => exit_codes::USER_ERROR,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for the JSON error envelope
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::TaskNotFound { week, id } => Some(serde_json::json!({
                "week": week,
                "id": id,
            })),
            Error::AmbiguousTaskId { prefix, count } => Some(serde_json::json!({
                "prefix": prefix,
                "matches": count,
            })),
            Error::LockFailed(path) => Some(serde_json::json!({
                "path": path.display().to_string(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for weekplan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
