//! Error types for API calls

use crate::request::Method;

/// Errors raised by the CDS API client
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never got a response
    #[error("transport error on {method} {path}: {message}")]
    Transport {
        /// Request method
        method: Method,
        /// Request path
        path: String,
        /// Underlying client error
        message: String,
    },

    /// The server answered with a non-success status
    #[error("{method} {path} returned {status}: {message}")]
    Status {
        /// Request method
        method: Method,
        /// Request path
        path: String,
        /// HTTP status code
        status: u16,
        /// Message reported by the server
        message: String,
    },

    /// The response body did not match the expected shape
    #[error("cannot decode response of {path}: {source}")]
    Decode {
        /// Request path
        path: String,
        /// Decoding failure
        #[source]
        source: serde_json::Error,
    },

    /// A request body could not be encoded
    #[error("cannot encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// An as-code payload was rejected before sending
    #[error("invalid as-code payload: {0}")]
    InvalidPayload(String),

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Create transport error
    pub fn transport(method: Method, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            method,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create status error
    pub fn status(
        method: Method,
        path: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Status {
            method,
            path: path.into(),
            status,
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    /// HTTP status, when the server answered
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the same call could succeed
    ///
    /// Informative only: the console never retries on its own.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ApiError::transport(Method::Get, "/project/a", "reset").is_retryable());
        assert!(ApiError::status(Method::Put, "/p", 503, "down").is_retryable());
        assert!(ApiError::status(Method::Put, "/p", 429, "slow").is_retryable());
        assert!(!ApiError::status(Method::Put, "/p", 409, "conflict").is_retryable());
        assert!(!ApiError::InvalidPayload("tab".to_string()).is_retryable());
    }

    #[test]
    fn status_display() {
        let err = ApiError::status(Method::Delete, "/project/a", 404, "not found");
        assert_eq!(err.to_string(), "DELETE /project/a returned 404: not found");
        assert_eq!(err.status_code(), Some(404));
    }
}
