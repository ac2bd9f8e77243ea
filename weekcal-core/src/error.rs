//! Error types for weekcal.

use thiserror::Error;

/// Errors that can occur while turning ICS text into a week view.
///
/// Only the parser fails; expansion, merging and grouping are total.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeekcalError {
    #[error("Malformed ICS document: {0}")]
    MalformedDocument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for weekcal operations.
pub type WeekcalResult<T> = Result<T, WeekcalError>;
