//! Error translation from the serving taxonomy to HTTP responses
//!
//! Every taxonomy member maps to a protocol-appropriate status code and an
//! `{"error": ...}` body. Structured application errors raised by models
//! carry their own status and pass through unchanged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use common::error::Error;

/// Wrapper turning a serving error into an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// HTTP status for the wrapped error
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::ModelNotFound(_) => StatusCode::NOT_FOUND,
            Error::ModelNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotSupported(_) => StatusCode::NOT_IMPLEMENTED,
            Error::Inference { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::ServerBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Model(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Application { status, .. } => StatusCode::from_u16(*status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(Error::ModelNotFound("m".to_string())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(Error::ModelNotReady("m".to_string())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError(Error::InvalidInput("bad".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(Error::Timeout("slow".to_string())).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError(Error::ServerBusy("full".to_string())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_application_error_keeps_its_status() {
        let err = ApiError(Error::Application {
            status: 422,
            message: "bad rows".to_string(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_invalid_application_status_falls_back() {
        let err = ApiError(Error::Application {
            status: 99,
            message: "odd".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
