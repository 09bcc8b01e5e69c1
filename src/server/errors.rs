//! Error type returned by request handlers.
//!
//! Renders as `{"error": "<text>"}` with a matching status code. Storage
//! failures are logged in full and reported generically.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::llm::ProviderInitError;
use crate::storage::StorageError;

/// Errors that end a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request is missing or has an invalid value.
    #[error("{0}")]
    BadRequest(String),

    /// The request body or query string could not be read.
    #[error("{message}")]
    Rejected {
        /// Status reported by the extractor.
        status: StatusCode,
        /// Extractor's description of the problem.
        message: String,
    },

    /// The referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The response provider could not be brought up.
    #[error("{0}")]
    Provider(#[from] ProviderInitError),
}

impl ApiError {
    /// Status code sent for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Storage(StorageError::InvalidRecord(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Rejected { status, .. } => *status,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(StorageError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Storage(StorageError::InvalidRecord(m) | StorageError::Conflict(m)) => m.clone(),
            Self::Storage(err) => {
                error!(error = %err, "storage failure");
                "internal server error".to_string()
            }
            Self::Provider(err) => {
                error!(error = %err, "response provider unavailable");
                err.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest("Message cannot be empty".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Storage(StorageError::Conflict("taken".to_string())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Provider(ProviderInitError::NoModels).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::NotFound("user 7 not found".to_string()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_bad_request_renders_message() {
        let response = ApiError::BadRequest("Message cannot be empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_rejection_keeps_its_status() {
        let error = ApiError::Rejected {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: "Expected request with `Content-Type: application/json`".to_string(),
        };
        assert_eq!(error.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            error.into_response().status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }
}
