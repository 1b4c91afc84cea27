//! Error types for cvsync-hook
//!
//! Maps store and reconciliation failures onto HTTP responses: problems with
//! the event itself are 400s, everything else is a 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong `Authorization` header (401)
    #[error("Incorrect auth: {0}")]
    Unauthorized(String),

    /// Event rejected (400)
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<cvsync_common::Error> for ApiError {
    fn from(err: cvsync_common::Error) -> Self {
        let detail = format!("{}: {}", err.kind(), err);
        if err.is_client_error() {
            ApiError::BadRequest(detail)
        } else {
            ApiError::Internal(detail)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "detail": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let err = ApiError::from(cvsync_common::Error::UnrecognizedEventKind("Nope".into()));
        assert_eq!(err.to_string(), r#"UnrecognizedEventKind: Unrecognized event type "Nope""#);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_errors_map_to_internal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = ApiError::from(cvsync_common::Error::from(io));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
