//! Engine error types

use thiserror::Error;
use viewer_fs::FsError;

/// Main engine error type
#[derive(Error, Debug)]
pub enum ViewerError {
    // ===== Not an error for the UI: navigation abandoned the work =====
    #[error("operation cancelled")]
    Cancelled,

    // ===== Recoverable (notify user, continue) =====
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O failure: {0}")]
    TransientIo(String),

    // ===== Fatal (storage root unreachable or misconfigured) =====
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),
}

impl ViewerError {
    /// Cancellation is silent; it must never surface as an error state.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ViewerError::Cancelled)
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ViewerError::Cancelled
                | ViewerError::NotFound(_)
                | ViewerError::AccessDenied(_)
                | ViewerError::InvalidPath(_)
                | ViewerError::TransientIo(_)
        )
    }

    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

impl From<FsError> for ViewerError {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound(p) => ViewerError::NotFound(p),
            FsError::AccessDenied(p) => ViewerError::AccessDenied(p),
            FsError::InvalidPath(p) | FsError::NotADirectory(p) => ViewerError::InvalidPath(p),
            FsError::Io(e) => ViewerError::TransientIo(e.to_string()),
            FsError::InvalidOperation(msg) => ViewerError::TransientIo(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
