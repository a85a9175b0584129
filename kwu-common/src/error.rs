//! Common error types for the keyword universe engine

use thiserror::Error;

/// Common result type for KWU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across KWU crates
///
/// Only boundary operations (record set construction, source validation, file
/// loading, configuration) produce these. The merge and scoring core is
/// infallible once its inputs are typed.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML decoding error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required attribute is missing from a row of an input source
    #[error("Source '{source_name}' is missing required attribute '{attribute}' (row {row})")]
    MissingAttribute {
        source_name: String,
        attribute: String,
        row: usize,
    },

    /// Keyword is empty once normalized
    #[error("Source '{source_name}' has an empty keyword (row {row})")]
    EmptyKeyword { source_name: String, row: usize },

    /// The same normalized keyword appears twice within one source
    #[error("Source '{source_name}' contains duplicate keyword '{keyword}'")]
    DuplicateKeyword {
        source_name: String,
        keyword: String,
    },

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
