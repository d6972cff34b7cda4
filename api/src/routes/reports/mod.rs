//! `/api/reports` endpoints.

pub mod add_report_route;
pub mod delete_report_route;
pub mod get_report_route;
pub mod member_reports_route;
pub mod report_form;
pub mod report_response;
pub mod translate_request;
pub mod translate_response;
pub mod translate_route;
pub mod update_report_route;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::app_state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/add", post(add_report_route::add_report_route))
        .route("/translate", post(translate_route::translate_route))
        .route(
            "/member/{family_member_id}",
            get(member_reports_route::member_reports_route),
        )
        .route(
            "/{id}",
            get(get_report_route::get_report_route)
                .put(update_report_route::update_report_route)
                .delete(delete_report_route::delete_report_route),
        )
}
