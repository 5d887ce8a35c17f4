//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for server operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Service error taxonomy
///
/// Every variant carries enough for the `{"message", "code"}` wire shape the
/// lookup endpoints answer with. `Upstream` is retryable and must never be
/// cached as a negative result; `Overloaded` signals the reader-slot
/// admission limit.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Service overloaded: {0}")]
    Overloaded(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ServiceError::Internal(_) | ServiceError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl From<spr_store::StoreError> for ServiceError {
    fn from(err: spr_store::StoreError) -> Self {
        if err.is_overloaded() {
            ServiceError::Overloaded("no free reader slot, retry later".to_string())
        } else {
            ServiceError::Storage(err.to_string())
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ServiceError::NotFound(ref message) => message.clone(),
            ServiceError::BadRequest(ref message) => message.clone(),
            ServiceError::Upstream(ref message) => {
                tracing::error!("Upstream failure: {}", message);
                message.clone()
            },
            ServiceError::Overloaded(ref message) => message.clone(),
            ServiceError::Timeout => "Operation timed out".to_string(),
            ServiceError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                "An internal error occurred".to_string()
            },
            ServiceError::Storage(ref message) => {
                tracing::error!("Storage error: {}", message);
                "A storage error occurred".to_string()
            },
        };

        let body = Json(json!({
            "message": message,
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Upstream("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::Overloaded("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ServiceError::Timeout.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_store_error_conversion() {
        let err = spr_store::StoreError::Config("bad path".to_string());
        let service: ServiceError = err.into();
        assert!(matches!(service, ServiceError::Storage(_)));
    }
}
