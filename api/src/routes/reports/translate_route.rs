use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    routes::reports::{translate_request::TranslateRequest, translate_response::TranslateResponse},
};

/// `POST /api/reports/translate`. Backend failure yields the failure marker
/// text with a 200, never an error.
pub async fn translate_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TranslateRequest>,
) -> Response {
    let request_id = headers
        .get("X-Request-Id")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-");
    debug!(%request_id, lang = ?req.lang, chars = req.text.len(), "translate_route: start");

    let translated = state
        .pipeline
        .translate(&req.text, req.lang.as_deref())
        .await;

    ApiResponse::success(TranslateResponse { translated }).into_response_with_status(StatusCode::OK)
}
