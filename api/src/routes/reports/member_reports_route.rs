use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppError,
    routes::reports::report_response::MemberReportsResponse,
};

/// Newest first. An unknown member simply has no reports.
pub async fn member_reports_route(
    State(state): State<Arc<AppState>>,
    Path(family_member): Path<String>,
) -> Response {
    match state.pipeline.list_by_member(&family_member).await {
        Ok(reports) => {
            debug!(%family_member, count = reports.len(), "member reports listed");
            ApiResponse::success(MemberReportsResponse {
                family_member,
                count: reports.len(),
                reports,
            })
            .into_response_with_status(StatusCode::OK)
        }
        Err(err) => AppError::from(err).into_response(),
    }
}
