//! Error types for the Bursar server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Application error type.
///
/// Maps the billing core's failure taxonomy onto HTTP: validation and
/// conflict failures are the caller's to resolve (4xx, never retried
/// automatically), gateway failures leave the payment pending and
/// retryable, and signature failures reject the request outright with
/// no ledger effect.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Invalid webhook signature: {0}")]
    Signature(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable code, used in redirect query parameters.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "invalid_request",
            AppError::Conflict(_) => "conflict",
            AppError::Gateway(_) => "gateway_error",
            AppError::Signature(_) => "invalid_signature",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Gateway(msg) => {
                tracing::error!("Payment gateway error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Payment gateway error: {}", msg),
                )
                    .into_response()
            }
            AppError::Signature(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NotFound("x".into()).code(), "not_found");
        assert_eq!(AppError::Conflict("x".into()).code(), "conflict");
        assert_eq!(AppError::Signature("x".into()).code(), "invalid_signature");
        assert_eq!(AppError::Gateway("x".into()).code(), "gateway_error");
    }

    #[test]
    fn test_signature_error_is_unauthorized() {
        let response = AppError::Signature("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_conflict_is_bad_request() {
        let response = AppError::Conflict("already generated".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
