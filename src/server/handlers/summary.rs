use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use super::{respond, ApiResult};
use crate::core::Caller;
use crate::domain::model::{SummaryRequest, SummaryResult};
use crate::server::state::AppState;

pub async fn summarize(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> ApiResult<SummaryResult> {
    let Json(request) = payload?;
    let result = state.service.summarize_and_save(&caller, request).await?;
    tracing::info!("✅ Summary saved for dream {}", result.dream_id);
    Ok(respond(StatusCode::OK, result))
}
