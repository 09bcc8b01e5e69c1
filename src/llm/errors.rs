//! Error types for upstream generation.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Upstream error description.
        message: String,
    },

    /// Upstream refused the request for quota or rate reasons.
    #[error("429 rate limited: {0}")]
    RateLimited(String),

    /// The call exceeded its time bound.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The response could not be interpreted.
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// Whether this error signals an exhausted quota or rate limit.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Status { status: 429, .. } => true,
            other => {
                let text = other.to_string().to_lowercase();
                text.contains("429") || text.contains("quota")
            }
        }
    }
}

/// Convenience result alias for generation calls.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Failure to bring the response provider up. Nothing can be generated
/// without a model, so this is surfaced to callers.
#[derive(Debug, Error)]
pub enum ProviderInitError {
    /// The model listing call failed.
    #[error("Error listing models: {0}")]
    Listing(#[from] GenerationError),

    /// The listing returned no models at all.
    #[error("No models found. Please check your API key and internet connection.")]
    NoModels,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_detection() {
        assert!(GenerationError::RateLimited("slow down".to_string()).is_rate_limited());
        assert!(
            GenerationError::Status {
                status: 429,
                message: "Too Many Requests".to_string(),
            }
            .is_rate_limited()
        );
        assert!(
            GenerationError::Status {
                status: 403,
                message: "Quota exceeded for project".to_string(),
            }
            .is_rate_limited()
        );
        assert!(!GenerationError::Timeout(Duration::from_secs(1)).is_rate_limited());
        assert!(
            !GenerationError::Status {
                status: 500,
                message: "internal".to_string(),
            }
            .is_rate_limited()
        );
    }
}
