//! Centralized error types for mail-export.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mail-export library.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The parsing collaborator could not decode the input stream.
    #[error("Failed to parse mail: {0}")]
    Parse(String),

    /// The parsing collaborator returned no usable content.
    #[error("The mail document is empty")]
    EmptyDocument,

    /// A render or parse option is malformed.
    #[error("Invalid option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },

    /// A nested mail attachment could not be parsed while naming it.
    #[error("Could not resolve attachment #{index}: {reason}")]
    AttachmentResolution { index: usize, reason: String },

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The HTML to PDF renderer failed.
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    /// The input format needs a collaborator that is not available.
    #[error("Unsupported input: {0}")]
    Unsupported(String),
}

/// Convenience alias for `Result<T, ExportError>`.
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an `InvalidOption` variant.
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (reading an input stream, piping to a child process).
impl From<std::io::Error> for ExportError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<stream>"),
            source,
        }
    }
}
