use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::error::ApiError;
use crate::server::handlers::{dreams, health, summary, transcribe};
use crate::server::state::AppState;

/// multipart 邊界與欄位標頭的額外空間
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// 建立 API router
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/dreams", get(dreams::list).post(dreams::create))
        .route(
            "/dreams/{id}",
            get(dreams::get)
                .put(dreams::put_summary)
                .patch(dreams::analyze)
                .delete(dreams::delete),
        )
        .route(
            "/transcribe",
            post(transcribe::transcribe).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/summary", post(summary::summarize));

    Router::new()
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(middleware::from_fn(method_not_allowed_envelope))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

/// 405 回應改成一般的錯誤外層格式，保留 `Allow` 標頭
async fn method_not_allowed_envelope(request: Request, next: Next) -> Response {
    let method: Method = request.method().clone();
    let response = next.run(request).await;

    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut rewritten =
        ApiError::new(StatusCode::METHOD_NOT_ALLOWED, format!("Method {} Not Allowed", method)).into_response();
    if let Some(allow) = parts.headers.get(axum::http::header::ALLOW) {
        rewritten
            .headers_mut()
            .insert(axum::http::header::ALLOW, allow.clone());
    }
    rewritten
}
