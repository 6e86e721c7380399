//! Domain-level error types for chat-roster.
//!
//! All errors are typed with `thiserror` and provide meaningful context
//! without exposing internal details to end users.

use thiserror::Error;

/// Application-level errors covering the core and its collaborator seams.
#[derive(Error, Debug)]
pub enum AppError {
    /// Blob storage operation failed.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// An export file could not be parsed.
    #[error("Failed to parse {file}: {message}")]
    Parse {
        file: String,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Workbook document serialization failed.
    #[error("Workbook error: {message}")]
    Workbook {
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// Sending a response through the messenger failed.
    #[error("Messenger error: {message}")]
    Messenger { message: String },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid or unexpected input data.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a storage error with context.
    pub fn storage(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a parse error for a specific export file.
    pub fn parse(file: impl Into<String>, err: serde_json::Error) -> Self {
        Self::Parse {
            file: file.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a parse error with a plain message.
    pub fn parse_msg(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a workbook error from a csv error.
    pub fn workbook(err: csv::Error) -> Self {
        Self::Workbook {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
