//! Error types for the IATI flows pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the IATI flows pipeline.
///
/// Records that are merely excluded (no value, unknown type code, out of the
/// month window) never produce an error; they are tallied as skipped.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or malformed input record).
    #[error("Data error: {0}")]
    Data(String),

    /// Unexpected failure inside currency conversion.
    #[error("Currency error: {0}")]
    Currency(String),

    /// Output writing error.
    #[error("Output error: {0}")]
    Output(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a currency error.
    pub fn currency(msg: impl Into<String>) -> Self {
        Error::Currency(msg.into())
    }

    /// Create an output error.
    pub fn output(msg: impl Into<String>) -> Self {
        Error::Output(msg.into())
    }
}
