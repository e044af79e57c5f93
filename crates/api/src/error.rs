//! Error to HTTP response mapping.
//!
//! Every error is rendered as `{"error": CODE, "message": text}` with the
//! status code the error type reports.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use enrollo_core::enrollment::EnrollmentError;
use enrollo_shared::AppError;

/// Errors returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Enrollment domain or persistence failure.
    Enrollment(EnrollmentError),
    /// Request, authentication or other application failure.
    App(AppError),
}

impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        Self::Enrollment(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl ApiError {
    fn parts(&self) -> (u16, &'static str, String) {
        match self {
            Self::Enrollment(err) => (err.status_code(), err.error_code(), err.to_string()),
            Self::App(err) => (err.status_code(), err.error_code(), err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            tracing::error!(error = %message, code, "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %message, code, "Request rejected");
            message
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}
