//! Error type for the API service
//!
//! Every handler returns [`ApiResult`]. Errors render as
//! `{"error": <name>, "message": <text>}`; server-side failures are logged
//! and their details replaced with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{
    checkout::CheckoutError, payment::ProcessorError, storage::StorageError, webhook::WebhookError,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests, try again later")]
    RateLimited,

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Checkout(CheckoutError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Checkout(CheckoutError::Processor(
                ProcessorError::Unavailable(_) | ProcessorError::NotConfigured,
            )) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Checkout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Webhook(e) if e.is_rejected_delivery() => StatusCode::BAD_REQUEST,
            ApiError::Webhook(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(StorageError::UnsupportedType) => StatusCode::BAD_REQUEST,
            ApiError::Storage(StorageError::TooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Storage(StorageError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(DatabaseError::Duplicate(_)) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_name(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "validation_error",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::CONFLICT => "conflict",
            StatusCode::TOO_MANY_REQUESTS => "rate_limited",
            StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
            StatusCode::SERVICE_UNAVAILABLE => "service_unavailable",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match status {
            StatusCode::SERVICE_UNAVAILABLE => {
                error!(error = %self, "Dependency unavailable");
                "Service temporarily unavailable, try again later".to_string()
            }
            s if s.is_server_error() => {
                error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": self.error_name(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::signature::SignatureError;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_mapping() {
        let processor = |e| ApiError::Checkout(CheckoutError::Processor(e));

        assert_eq!(
            processor(ProcessorError::Unavailable("timeout".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            processor(ProcessorError::Rejected {
                status: 400,
                message: "bad price".into()
            })
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Checkout(CheckoutError::Validation("bad date".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Webhook(WebhookError::Signature(SignatureError::NoMatchingSignature))
                .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Webhook(WebhookError::BookingNotFound(uuid::Uuid::nil())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Storage(StorageError::TooLarge(10)).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let response = ApiError::Internal("connection string leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal_error");
        assert_eq!(json["message"], "Internal server error");
    }
}
