use report_store::Report;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub message: String,
    pub report: Report,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberReportsResponse {
    pub family_member: String,
    pub count: usize,
    pub reports: Vec<Report>,
}

#[derive(Debug, Serialize)]
pub struct DeleteReportResponse {
    pub message: String,
    pub id: String,
}
