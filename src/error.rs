//! Error types for skill_fetch.

use std::path::PathBuf;

use crate::codes::FieldKind;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while scraping, encoding or writing skill data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure (DNS, connection refused, timeout).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Expected markup was missing from a fetched page.
    #[error("Extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    /// Label absent from a closed code table.
    #[error("Unknown {kind} label: {label:?}")]
    UnknownLabel { kind: FieldKind, label: String },

    /// Input row does not carry the required columns.
    #[error("{}:{line}: {reason}", file.display())]
    Row {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    /// Record id that cannot name a file.
    #[error("Invalid record id {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    /// Invalid CSS selector.
    #[error("Invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an extraction error for a page.
    pub fn extraction(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Extraction {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether this error only affects a single record and the run may continue.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::Status { .. }
                | Error::Extraction { .. }
                | Error::UnknownLabel { .. }
                | Error::InvalidId { .. }
        )
    }
}
