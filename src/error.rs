//! Error types for eigqr

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using eigqr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, factoring, or iterating a matrix
#[derive(Error, Debug)]
pub enum Error {
    /// Shape mismatch between two matrices or a buffer and a matrix
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Element access outside the matrix
    #[error("Index ({row}, {col}) out of bounds for {n}x{n} matrix")]
    IndexOutOfBounds {
        /// Requested row
        row: usize,
        /// Requested column
        col: usize,
        /// Matrix dimension
        n: usize,
    },

    /// Solver or worker-group configuration rejected before any work started
    #[error("Invalid configuration '{field}': {reason}")]
    InvalidConfig {
        /// The offending setting
        field: &'static str,
        /// Reason for rejection
        reason: String,
    },

    /// Input file could not be opened or read
    #[error("Cannot read '{}': {source}", path.display())]
    Io {
        /// Path of the input file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Input text is not a valid matrix description
    #[error("Parse error at token {token}: {reason}")]
    Parse {
        /// Zero-based index of the offending token
        token: usize,
        /// What went wrong
        reason: String,
    },

    /// The coordinator failed during setup; reported on every other worker
    #[error("Coordinator reported a setup failure")]
    Setup,

    /// Another worker failed and the group was torn down mid-collective
    #[error("Worker group aborted")]
    GroupAborted,

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a configuration error
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Create a parse error
    pub fn parse(token: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            token,
            reason: reason.into(),
        }
    }

    /// True for errors that are a consequence of another worker's failure
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::Setup | Self::GroupAborted)
    }
}
