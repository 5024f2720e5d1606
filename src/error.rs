//! Error types for feedwalk
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for feedwalk
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Paging Errors (fatal)
    // ============================================================================
    #[error("Retry limit ({retry_limit}) exceeded; last error: {last_error}")]
    RetryLimitExceeded { retry_limit: u32, last_error: String },

    #[error("Result dispatch failed during {stage}")]
    Dispatch { stage: DispatchStage },

    #[error("Invalid or corrupt cursor: '{value}'")]
    CursorFormat { value: String },

    #[error("Reference to unknown id '{id}' in field '{field}'")]
    DanglingReference { field: String, id: String },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sink call that reported a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Start,
    Emit,
    Finish,
}

impl std::fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Emit => f.write_str("emit"),
            Self::Finish => f.write_str("finish"),
        }
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a dispatch error
    pub fn dispatch(stage: DispatchStage) -> Self {
        Self::Dispatch { stage }
    }

    /// Create a cursor format error
    pub fn cursor_format(value: impl Into<String>) -> Self {
        Self::CursorFormat {
            value: value.into(),
        }
    }

    /// Create a dangling reference error
    pub fn dangling(field: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DanglingReference {
            field: field.into(),
            id: id.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Check if a failed fetch is worth repeating.
    ///
    /// Configuration mistakes and paging-state errors fail the same way on
    /// every attempt; anything else a fetch reports may be transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::Config { .. }
                | Error::InvalidConfigValue { .. }
                | Error::YamlParse(_)
                | Error::InvalidUrl(_)
                | Error::RetryLimitExceeded { .. }
                | Error::Dispatch { .. }
                | Error::CursorFormat { .. }
                | Error::DanglingReference { .. }
        )
    }
}

/// Result type alias for feedwalk
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::dispatch(DispatchStage::Finish);
        assert_eq!(err.to_string(), "Result dispatch failed during finish");

        let err = Error::dangling("creator", "u1");
        assert_eq!(
            err.to_string(),
            "Reference to unknown id 'u1' in field 'creator'"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::transport("connection reset").is_retryable());
        assert!(Error::http_status(500, "").is_retryable());
        assert!(Error::http_status(404, "").is_retryable());
        assert!(Error::decode("truncated").is_retryable());
        let truncated = serde_json::from_str::<serde_json::Value>("{truncated").unwrap_err();
        assert!(Error::from(truncated).is_retryable());
        assert!(Error::from(std::io::Error::other("reset")).is_retryable());

        assert!(!Error::cursor_format("nope").is_retryable());
        assert!(!Error::dangling("creator", "u1").is_retryable());
        assert!(!Error::dispatch(DispatchStage::Emit).is_retryable());
        assert!(!Error::config("test").is_retryable());
        assert!(!Error::invalid_value("page_size", "must be positive").is_retryable());
    }
}
