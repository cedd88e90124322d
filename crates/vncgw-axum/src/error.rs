//! Axum-specific error types and mappings.
//!
//! Maps `GatewayError` to HTTP status codes and a small JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use vncgw_core::GatewayError;

#[derive(Debug, Error)]
pub enum HttpError {
    /// Malformed session path.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// No free display number.
    #[error("Too many sessions: {0}")]
    TooManyRequests(String),

    /// A helper or the application failed to start.
    #[error("Failed dependency: {0}")]
    FailedDependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::FailedDependency(_) => StatusCode::FAILED_DEPENDENCY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() || status == StatusCode::FAILED_DEPENDENCY {
            warn!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<GatewayError> for HttpError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::ResourceExhausted { .. } => Self::TooManyRequests(err.to_string()),
            GatewayError::SpawnFailed { .. } => Self::FailedDependency(err.to_string()),
            GatewayError::TemplateRenderFailed(msg) => {
                Self::Internal(format!("Template: {msg}"))
            }
            GatewayError::InvalidRequest(msg) => Self::BadRequest(msg),
            GatewayError::Internal(msg) => Self::Internal(msg),
        }
    }
}
