//! Error types for the legends import pipeline.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Label used in place of a file path for documents parsed from memory.
pub const MEMORY_ORIGIN: &str = "<memory>";

/// Main error type for conversion runs.
#[derive(Error, Debug)]
pub enum ImportError {
    /// One of the two input documents does not exist
    #[error("Input file not found: {}", .path.display())]
    MissingInputFile { path: PathBuf },

    /// Reading an input document failed
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be parsed into a single element tree
    #[error("Malformed document {origin}: {message}")]
    MalformedDocument { origin: String, message: String },

    /// Invalid configuration (unknown encoding label, unreadable config file, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The storage layer rejected a table or one of its rows
    #[error("Storage failed for table {table}{}: {message}", row_suffix(.row))]
    Storage {
        table: String,
        row: Option<usize>,
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(index) => format!(" at row {}", index),
        None => String::new(),
    }
}

impl ImportError {
    /// Create a MalformedDocument error for the given origin
    pub fn malformed(origin: impl Into<String>, message: impl Into<String>) -> Self {
        ImportError::MalformedDocument {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Create an Io error tagged with the file it concerns
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        ImportError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a Storage error
    pub fn storage(
        table: impl Into<String>,
        row: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        ImportError::Storage {
            table: table.into(),
            row,
            message: message.into(),
        }
    }

    /// True for failures that abort the run before any document is parsed.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, ImportError::MissingInputFile { .. })
    }
}

/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;
