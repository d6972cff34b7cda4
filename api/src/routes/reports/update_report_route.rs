use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
};
use report_pipeline::UpdateRequest;
use tracing::{info, instrument};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::reports::{report_form::ReportForm, report_response::ReportResponse},
};

/// `PUT /api/reports/{id}`: merge fields, append files, optionally re-run analysis.
#[instrument(name = "update_report_route", skip(state, multipart))]
pub async fn update_report_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = ReportForm::read(multipart, state.limits.max_files).await?;
    let rerun = form.rerun_ai;
    let run = state
        .pipeline
        .update(
            &id,
            UpdateRequest {
                fields: form.fields,
                files: form.files,
                rerun_analysis: rerun,
                language: form.lang,
            },
        )
        .await?;

    info!(files = run.report.files.len(), rerun, "report updated");
    Ok(ApiResponse::success(ReportResponse {
        message: "Report updated".into(),
        report: run.report,
    })
    .into_response_with_status(StatusCode::OK))
}
