use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::core::Caller;
use crate::server::error::ApiError;
use crate::server::state::AppState;

/// 從 `Authorization: Bearer <token>` 取出 token
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::unauthorized("Missing or invalid authorization header"))?
            .to_string();

        match state.auth.verify(&token).await {
            Ok(user) => {
                tracing::debug!("🔐 Authenticated user {}", user.id);
                Ok(Caller::new(user, token))
            }
            Err(e) => {
                tracing::warn!("Authentication failed: {}", e);
                Err(ApiError::unauthorized("Invalid or expired token"))
            }
        }
    }
}
