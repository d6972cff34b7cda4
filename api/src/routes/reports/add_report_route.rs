use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use report_pipeline::IngestRequest;
use tracing::{debug, info, instrument};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::reports::{report_form::ReportForm, report_response::ReportResponse},
};

/// `POST /api/reports/add`: create a report from form fields and up to N files,
/// then analyse the first file. Analysis trouble never fails the request.
#[instrument(name = "add_report_route", skip_all)]
pub async fn add_report_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> AppResult<Response> {
    if let Some(id) = headers.get("X-Request-Id").and_then(|h| h.to_str().ok()) {
        debug!(%id, "request id attached");
    }

    let form = ReportForm::read(multipart, state.limits.max_files).await?;
    let run = state
        .pipeline
        .ingest(IngestRequest {
            fields: form.fields,
            files: form.files,
            language: form.lang,
        })
        .await?;

    info!(report_id = %run.report.id, files = run.report.files.len(), "report added");
    Ok(ApiResponse::success(ReportResponse {
        message: "Report created".into(),
        report: run.report,
    })
    .into_response_with_status(StatusCode::CREATED))
}
