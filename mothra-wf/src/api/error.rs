//! API error type

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<mothra_common::Error> for ApiError {
    fn from(err: mothra_common::Error) -> Self {
        match err {
            mothra_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            err if err.is_client_error() => ApiError::BadRequest(err.to_string()),
            err => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use mothra_common::Error;

    #[test]
    fn test_error_classification() {
        assert!(matches!(
            ApiError::from(Error::invalid("missing pos")),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(Error::RejectedInput("shell".into())),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(Error::NotFound("x".into())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(Error::Engine("yap crashed".into())),
            ApiError::Internal(_)
        ));
    }
}
