use axum::{extract::State, http::StatusCode};
use chrono::{SecondsFormat, Utc};

use super::{respond, ApiResult};
use crate::domain::model::HealthStatus;
use crate::server::state::AppState;

pub async fn health(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    Ok(respond(
        StatusCode::OK,
        HealthStatus {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            environment: state.environment.clone(),
            version: state.version.to_string(),
        },
    ))
}
