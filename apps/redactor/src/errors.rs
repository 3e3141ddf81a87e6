use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::publish::PublishError;
use crate::redaction::payload::PayloadError;
use crate::render::{DocumentError, RenderError};

/// Application-level error type.
/// Only input errors and publisher failures are fatal for a job; everything
/// else is absorbed inside the pipeline before it gets here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::Validation(rejection.body_text())
        }
    }
}

impl From<PayloadError> for AppError {
    fn from(e: PayloadError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<RenderError> for AppError {
    fn from(e: RenderError) -> Self {
        AppError::Render(e.to_string())
    }
}

impl From<PublishError> for AppError {
    fn from(e: PublishError) -> Self {
        AppError::Publish(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            AppError::Publish(msg) => {
                tracing::error!("Publish error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    format!("The redacted document could not be stored: {msg}"),
                )
            }
            AppError::Render(msg) => {
                tracing::error!("Render error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The redacted document could not be rendered".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_error_maps_to_bad_request() {
        let err: AppError = PayloadError::Missing.into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_publish_error_maps_to_bad_gateway() {
        let err: AppError = PublishError::Upload("bucket missing".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
