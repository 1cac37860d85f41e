use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::{respond, ApiResult};
use crate::core::Caller;
use crate::domain::model::{AnalysisRequest, Dream, Message, NewDream, SummaryUpdate};
use crate::server::state::AppState;

pub async fn list(State(state): State<AppState>, caller: Caller) -> ApiResult<Vec<Dream>> {
    let dreams = state.service.list(&caller).await?;
    tracing::debug!("Listing {} dreams for {}", dreams.len(), caller.user_id());
    Ok(respond(StatusCode::OK, dreams))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<NewDream>, JsonRejection>,
) -> ApiResult<Dream> {
    let Json(new_dream) = payload?;
    let dream = state.service.create(&caller, new_dream).await?;
    Ok(respond(StatusCode::CREATED, dream))
}

pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Dream> {
    let dream = state.service.get(&caller, &id).await?;
    Ok(respond(StatusCode::OK, dream))
}

pub async fn put_summary(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<SummaryUpdate>, JsonRejection>,
) -> ApiResult<Dream> {
    let Json(update) = payload?;
    let dream = state.service.put_summary(&caller, &id, update.summary).await?;
    Ok(respond(StatusCode::OK, dream))
}

pub async fn analyze(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<Dream> {
    let Json(request) = payload?;
    tracing::info!("🧠 Analyzing dream {} ({:?})", id, request);
    let dream = state.service.analyze(&caller, &id, request).await?;
    Ok(respond(StatusCode::OK, dream))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Message> {
    let message = state.service.delete(&caller, &id).await?;
    Ok(respond(StatusCode::OK, message))
}
