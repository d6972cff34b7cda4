use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppError,
    routes::reports::report_response::ReportResponse,
};

pub async fn get_report_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.pipeline.get(&id).await {
        Ok(report) => ApiResponse::success(ReportResponse {
            message: "Report found".into(),
            report,
        })
        .into_response_with_status(StatusCode::OK),
        Err(err) => AppError::from(err).into_response(),
    }
}
