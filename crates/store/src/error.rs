//! Error types for the storage layer

use thiserror::Error;

/// Result type alias for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Object missing, or the origin could not be reached
    #[error("Geometry unavailable at {path}: {reason}")]
    NotFound {
        /// Object path inside the bucket
        path: String,
        /// What went wrong
        reason: String,
    },

    /// Object exists but does not decode into the expected document
    #[error("Malformed payload at {path}: {reason}")]
    MalformedPayload {
        /// Object path inside the bucket
        path: String,
        /// Decoder message
        reason: String,
    },

    /// No storage endpoint configured
    #[error("Store not configured: {0}")]
    NotConfigured(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote API returned an error response
    #[error("API error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Circuit breaker is open
    #[error("Circuit breaker is open - storage temporarily unavailable")]
    CircuitOpen,

    /// All retry attempts exhausted
    #[error("All {attempts} retry attempts failed: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last error message
        last_error: String,
    },
}

/// Numeric codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StoreErrorCode {
    NotFound = 20001,
    MalformedPayload = 20002,
    NotConfigured = 20003,
    Transport = 20004,
    Io = 20005,
    CircuitOpen = 20006,
}

impl StoreError {
    /// Create a not-found error
    pub fn not_found(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed-payload error
    pub fn malformed(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedPayload {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an API response error
    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    pub fn code(&self) -> StoreErrorCode {
        match self {
            Self::NotFound { .. } => StoreErrorCode::NotFound,
            Self::MalformedPayload { .. } => StoreErrorCode::MalformedPayload,
            Self::NotConfigured(_) => StoreErrorCode::NotConfigured,
            Self::Io(_) => StoreErrorCode::Io,
            Self::CircuitOpen => StoreErrorCode::CircuitOpen,
            Self::Request(_) | Self::Json(_) | Self::ApiResponse { .. } | Self::RetriesExhausted { .. } => {
                StoreErrorCode::Transport
            }
        }
    }

    /// Geometry cannot be served; callers fall back to sample data
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::MalformedPayload { .. })
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            // Overpass answers 429 and 504 under load
            Self::ApiResponse { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(StoreError::api_response(503, "busy").is_retryable());
        assert!(StoreError::api_response(429, "slow down").is_retryable());
        assert!(!StoreError::api_response(404, "missing").is_retryable());
        assert!(!StoreError::CircuitOpen.is_retryable());
    }

    #[test]
    fn test_unavailable_errors() {
        assert!(StoreError::not_found("JP-13/x", "404").is_unavailable());
        assert!(StoreError::malformed("JP-13/x", "eof").is_unavailable());
        assert!(!StoreError::NotConfigured("no url".into()).is_unavailable());
        assert_eq!(StoreError::not_found("a", "b").code() as u32, 20001);
    }
}
