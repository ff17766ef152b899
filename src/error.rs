//! Custom error types for rustpapertask.
//!
//! This module defines all error types used throughout the pipeline.
//! All library functions return `Result<T, PaperTaskError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for rustpapertask operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum PaperTaskError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External API returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from API
        message: String,
    },

    /// Rate limited by external API
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// The model backend answered with a payload that is not a chat completion
    #[error("Provider error: {0}")]
    Provider(String),

    /// Parsing error (search results, input files)
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl PaperTaskError {
    /// Whether a retry of the same request may succeed.
    ///
    /// Only transport and provider failures qualify; a bad request or a
    /// missing configuration fails the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Api { .. } | Self::RateLimited(_) | Self::Provider(_)
        )
    }

    /// Whether the error makes all further work in a batch impossible.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias using `PaperTaskError`
pub type Result<T> = std::result::Result<T, PaperTaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(PaperTaskError::RateLimited(5).is_transient());
        assert!(PaperTaskError::Provider("empty choices".into()).is_transient());
        assert!(PaperTaskError::Api { code: 502, message: "bad gateway".into() }.is_transient());
        assert!(!PaperTaskError::Config("no key".into()).is_transient());
        assert!(!PaperTaskError::Validation("three messages".into()).is_transient());
    }

    #[test]
    fn test_only_config_is_fatal() {
        assert!(PaperTaskError::Config("no key".into()).is_fatal());
        assert!(!PaperTaskError::Provider("x".into()).is_fatal());
        assert!(!PaperTaskError::Parse("x".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        let err = PaperTaskError::Api { code: 503, message: "unavailable".into() };
        assert_eq!(err.to_string(), "API error: 503 - unavailable");
    }
}
