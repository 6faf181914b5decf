//! Error types for the Notebook core library.

use thiserror::Error;

/// All errors that can occur within the Notebook core library.
#[derive(Debug, Error)]
pub enum NotebookError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A node ID was requested that does not exist in the database.
    #[error("Node not found: {0}")]
    NodeNotFound(i64),

    /// An image ID was requested that does not exist in the database.
    #[error("Image not found: {0}")]
    ImageNotFound(i64),

    /// A parent change would place a node beneath one of its own descendants.
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// A rich-text body could not be converted to Markdown.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Export metadata could not be serialized to JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`NotebookError`].
pub type Result<T> = std::result::Result<T, NotebookError>;

/// Coarse classification a presentation boundary uses to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced node or image does not exist.
    NotFound,
    /// The request itself was rejected; the message is safe to show the caller.
    BadRequest,
    /// The store or filesystem failed underneath the request.
    Internal,
}

impl NotebookError {
    /// Returns the [`ErrorKind`] this error maps to at the boundary.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NodeNotFound(_) | Self::ImageNotFound(_) => ErrorKind::NotFound,
            Self::InvalidMove(_) | Self::Conversion(_) | Self::Json(_) => ErrorKind::BadRequest,
            Self::Database(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::NodeNotFound(_) => "Document not found".to_string(),
            Self::ImageNotFound(_) => "Image not found".to_string(),
            Self::InvalidMove(msg) => msg.clone(),
            Self::Conversion(msg) => format!("Could not convert document: {msg}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}
