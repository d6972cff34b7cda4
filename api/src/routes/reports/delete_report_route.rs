use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::reports::report_response::DeleteReportResponse,
};

/// Removes the record only; stored blobs are left in place.
pub async fn delete_report_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    state.pipeline.delete(&id).await?;
    Ok(ApiResponse::success(DeleteReportResponse {
        message: "Report deleted".into(),
        id,
    })
    .into_response_with_status(StatusCode::OK))
}
