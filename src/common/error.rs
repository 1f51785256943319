//! Error types for the index and its benchmark harness.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors surfaced by this crate.
///
/// A missing key is not an error: lookups return `Option` and deletes
/// return `bool`.
#[derive(Debug, Error)]
pub enum Error {
    /// A tree order below the minimum, or unusable harness options.
    ///
    /// Raised at construction time and never recovered from.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// I/O error while writing a results file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Results could not be encoded as JSON.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// Results could not be encoded as CSV.
    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),
}
