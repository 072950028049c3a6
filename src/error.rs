//! Error types for forgefed-node
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::validation::NotValid;

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Malformed request (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Federation value failed validation (406)
    #[error(transparent)]
    NotValid(#[from] NotValid),

    /// Activity rejected by federation rules (406)
    #[error("Not acceptable: {0}")]
    NotAcceptable(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Remote peer misbehaved (502)
    #[error("Federation error: {0}")]
    Federation(String),

    /// Outbound call exceeded its deadline (504)
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// Outbound call cancelled by the caller (503)
    #[error("Request to {0} was cancelled")]
    Cancelled(String),

    /// Signature verification failed (401)
    #[error("Invalid signature")]
    InvalidSignature,

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                "invalid_signature",
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::NotValid(_) => (
                StatusCode::NOT_ACCEPTABLE,
                self.to_string(),
                "not_valid",
            ),
            AppError::NotAcceptable(msg) => {
                (StatusCode::NOT_ACCEPTABLE, msg.clone(), "not_acceptable")
            }
            AppError::Federation(msg) => (StatusCode::BAD_GATEWAY, msg.clone(), "federation"),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string(), "http_client"),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.to_string(), "timeout"),
            AppError::Cancelled(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                self.to_string(),
                "cancelled",
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
                "database",
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL
            .with_label_values(&[error_type, "unknown"])
            .inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_valid_maps_to_not_acceptable() {
        let err: AppError = NotValid::new("ForgeLike", vec!["StartTime was invalid.".into()]).into();
        assert_eq!(
            err.to_string(),
            "Validation Error: ForgeLike: StartTime was invalid."
        );
        assert_eq!(err.into_response().status(), StatusCode::NOT_ACCEPTABLE);
    }

    #[test]
    fn test_transport_errors_map_to_gateway_statuses() {
        let timeout = AppError::Timeout("https://slow.example".into());
        assert_eq!(timeout.into_response().status(), StatusCode::GATEWAY_TIMEOUT);

        let remote = AppError::Federation("got non 200 status code for id: x".into());
        assert_eq!(remote.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
