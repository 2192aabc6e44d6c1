// src/error.rs
//
// Crate-wide error type. Every fallible operation in the library returns
// `Result<T>`; the binary wraps these in `anyhow` at the top level.

use thiserror::Error;

/// Errors raised while loading, slicing or converting simulation output.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A user-supplied argument is outside the allowed set.
    #[error("{0}")]
    InvalidArgument(String),

    /// An OMF file could not be matched against the ODT table.
    #[error("cannot cross-reference '{file}': {reason}")]
    CrossReference { file: String, reason: String },

    /// Input arrays have an unusable shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("slice coordinate {coord:e} is outside the mesh along {axis} ([{min:e}, {max:e}])")]
    CoordinateOutOfRange {
        axis: char,
        coord: f64,
        min: f64,
        max: f64,
    },

    /// Malformed OVF/ODT content.
    #[error("parse error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("plotting error: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, ViewError>;

impl ViewError {
    pub(crate) fn cross_reference(file: impl Into<String>, reason: impl Into<String>) -> Self {
        ViewError::CrossReference {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        ViewError::Format {
            line,
            message: message.into(),
        }
    }
}
