pub mod dreams;
pub mod health;
pub mod summary;
pub mod transcribe;

use axum::{http::StatusCode, Json};

use crate::domain::model::ApiResponse;

/// 成功回應：`{ success: true, data }`
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), crate::server::error::ApiError>;

pub(crate) fn respond<T>(status: StatusCode, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (status, Json(ApiResponse::ok(data)))
}
