//! Error types for IntentForge Ledger.
//!
//! Defines a unified error type that maps onto the `{success:false, error}`
//! response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned for any path the router does not know.
pub const ENDPOINT_NOT_FOUND: &str = "Endpoint not found";

/// Message returned for every uncaught handler failure.
pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";

/// Unified error type for ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body for API clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: None,
        }
    }

    /// Build the full response for a status code and envelope.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            LedgerError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            LedgerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            LedgerError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorResponse::new(msg)),
            LedgerError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
            // Request bodies are rejected as BadRequest by the extractor, so
            // this only fires for server-side encoding and decoding.
            LedgerError::Serialization(e) => {
                tracing::error!(error = %e, "Serialization error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(INTERNAL_SERVER_ERROR),
                )
            }
            LedgerError::Database(e) => {
                // Log the actual error but don't expose internals
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(INTERNAL_SERVER_ERROR),
                )
            }
            LedgerError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(INTERNAL_SERVER_ERROR),
                )
            }
        };

        body.into_response_with(status)
    }
}

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_error_is_not_leaked() {
        let response =
            LedgerError::Internal("disk on fire at /var/lib/secret".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_serialization_error_is_generic_500() {
        let cause = serde_json::from_str::<serde_json::Value>("{\"amount\": 5000").unwrap_err();
        let response = LedgerError::from(cause).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], INTERNAL_SERVER_ERROR);
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_conflict_status() {
        let response = LedgerError::Conflict("already logged".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "already logged");
        assert!(body.get("details").is_none());
    }
}
