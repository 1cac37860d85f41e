use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::model::ApiResponse;
use crate::utils::error::{ErrorCategory, LucidlyError};

/// API 錯誤，回應時包成 `{ success: false, error }`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::err(self.message))).into_response()
    }
}

impl From<LucidlyError> for ApiError {
    fn from(err: LucidlyError) -> Self {
        match &err {
            LucidlyError::ValidationError { .. } => ApiError::bad_request(err.user_friendly_message()),
            LucidlyError::NotFound { .. } => ApiError::not_found(err.user_friendly_message()),
            LucidlyError::Unauthorized { .. } => ApiError::unauthorized(err.user_friendly_message()),
            LucidlyError::TimeoutError { .. } => {
                ApiError::new(StatusCode::REQUEST_TIMEOUT, err.user_friendly_message())
            }
            LucidlyError::Internal { .. } => ApiError::internal(err.user_friendly_message()),
            _ if err.category() == ErrorCategory::Configuration => {
                tracing::error!("❌ Configuration problem: {}", err);
                ApiError::internal(err.user_friendly_message())
            }
            _ => {
                tracing::error!(
                    "❌ Unhandled error: {} (Category: {:?}, Severity: {:?})",
                    err,
                    err.category(),
                    err.severity()
                );
                ApiError::internal("Internal server error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {}", rejection.body_text());
        ApiError::bad_request("Invalid JSON body")
    }
}
