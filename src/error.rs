use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::providers::ProviderError;

/// Application-wide error types with appropriate HTTP status codes.
///
/// Every variant maps to an Anthropic-style error kind so clients that
/// already speak the Messages API can parse relay failures the same way
/// they parse upstream ones.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request too large: {0}")]
    PayloadTooLarge(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Upstream request timed out: {0}")]
    UpstreamTimeout(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// HTTP status and wire-level error kind for this error.
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "authentication_error"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "request_too_large"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found_error"),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "api_error"),
            AppError::UpstreamTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout_error"),
            AppError::Provider(_) | AppError::ConfigError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "api_error")
            }
        }
    }
}

/// Error envelope in the Anthropic Messages API format:
/// `{"type":"error","error":{"type":"...","message":"..."}}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope<'a> {
    #[serde(rename = "type")]
    pub envelope_type: &'static str,
    pub error: ErrorDetail<'a>,
}

/// Inner error object carrying the machine-readable kind.
#[derive(Debug, Serialize)]
pub struct ErrorDetail<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub message: &'a str,
}

/// Serialize an error kind/message pair with the given status code.
pub fn write_error(status: StatusCode, kind: &str, message: &str) -> Response {
    let body = ErrorEnvelope {
        envelope_type: "error",
        error: ErrorDetail { kind, message },
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        // Client errors carry a message that is safe to echo; server-side
        // failures are logged in full and replaced by a fixed message.
        let message = match &self {
            AppError::Authentication(reason) => reason.clone(),
            AppError::InvalidRequest(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::MethodNotAllowed => "Method not allowed".to_string(),
            AppError::Upstream(_) => {
                tracing::error!(error = %self, "Upstream request failed");
                "Upstream provider is unavailable. Please try again later.".to_string()
            }
            AppError::UpstreamTimeout(_) => {
                tracing::error!(error = %self, "Upstream request timed out");
                "Upstream provider did not respond in time.".to_string()
            }
            AppError::Provider(_) | AppError::ConfigError(_) => {
                tracing::error!(error = %self, "Request failed");
                "An internal error occurred.".to_string()
            }
        };

        write_error(status, kind, &message)
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::InvalidRequest(rejection.body_text())
        }
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
