use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
};

use super::{respond, ApiResult};
use crate::core::Caller;
use crate::domain::model::Transcript;
use crate::server::error::ApiError;
use crate::server::state::AppState;

const DEFAULT_AUDIO_MIME: &str = "audio/wav";

pub async fn transcribe(
    State(state): State<AppState>,
    caller: Caller,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Transcript> {
    let mut multipart =
        multipart.map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {}", e.body_text())))?;

    let mut audio = Vec::new();
    let mut mime_type = DEFAULT_AUDIO_MIME.to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), format!("Failed reading multipart field: {}", e.body_text())))?
    {
        if field.name() != Some("file") {
            continue;
        }

        if let Some(content_type) = field.content_type() {
            mime_type = content_type.to_string();
        }
        let file_name = field.file_name().unwrap_or("recording").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), format!("Failed reading audio file: {}", e.body_text())))?;

        if bytes.len() > state.max_upload_bytes {
            tracing::warn!(
                "Rejected {} byte upload from {} (limit {})",
                bytes.len(),
                caller.user_id(),
                state.max_upload_bytes
            );
            return Err(ApiError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Audio file exceeds the {} byte limit", state.max_upload_bytes),
            ));
        }

        tracing::info!(
            "🎙️ Transcription request from {}: {} ({} bytes, {})",
            caller.user_id(),
            file_name,
            bytes.len(),
            mime_type
        );
        audio = bytes.to_vec();
        break;
    }

    let transcript = state.service.transcribe(&audio, &mime_type).await?;
    Ok(respond(StatusCode::OK, Transcript { transcript }))
}
