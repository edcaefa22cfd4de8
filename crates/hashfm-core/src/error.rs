//! Error types for `hashfm-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`. Errors that escape a tracked
//! operation are frozen into an [`OperationError`] and recorded in the
//! failed log.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backend::BackendError;
use crate::event::OperationKind;

/// Code for a bulk add that returned an unexpected number of results.
pub const ERR_API_RESPONSE: &str = "ERR_API_RESPONSE";
/// Code for a copy whose destination already exists.
pub const ERR_FOLDER_EXISTS: &str = "ERR_FOLDER_EXISTS";

/// Unified error type for all core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The backend answered a bulk add with the wrong number of results.
    #[error("API returned a partial response (expected {expected} results, got {actual})")]
    ApiResponse { expected: usize, actual: usize },

    /// Copying an upload into the mutable namespace hit an existing entry.
    #[error("folder already exists: {path}")]
    FolderExists { path: String },

    /// A configuration or backend path does not exist.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// A logical path could not be interpreted.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The requested operation is not available for this input.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Failed to parse a TOML configuration file.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// The operation's future was dropped before it settled.
    #[error("operation was cancelled")]
    Cancelled,

    /// The storage backend rejected a call.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// An I/O error that doesn't fit a more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Returns the stable error code, if this error carries one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ApiResponse { .. } => Some(ERR_API_RESPONSE),
            Self::FolderExists { .. } => Some(ERR_FOLDER_EXISTS),
            Self::Backend(e) => e.code.as_deref(),
            _ => None,
        }
    }
}

/// Convenience alias used throughout `hashfm-core`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Snapshot of a failed operation's error, as stored in the failed log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    pub code: String,
    pub message: String,
}

impl OperationError {
    /// Freezes `err` for the failed log, falling back to `ERR_<KIND>` when the
    /// error has no code of its own.
    pub fn from_core(kind: OperationKind, err: &CoreError) -> Self {
        let code = err
            .code()
            .map(str::to_string)
            .unwrap_or_else(|| kind.default_error_code());
        Self {
            code,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
