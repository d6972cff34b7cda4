//! Multipart intake shared by add and update.

use axum::extract::Multipart;
use chrono::{DateTime, NaiveDate};
use report_pipeline::{PipelineError, UploadedFile};
use report_store::ReportFields;
use tracing::debug;

use crate::error_handler::{AppError, AppResult};

/// Field name that carries file parts.
const FILES_FIELD: &str = "files";

#[derive(Debug, Default)]
pub struct ReportForm {
    pub fields: ReportFields,
    pub files: Vec<UploadedFile>,
    /// `rerunAI=true`
    pub rerun_ai: bool,
    pub lang: Option<String>,
}

impl ReportForm {
    /// Reads every part; stops early once more than `max_files` files arrive.
    pub async fn read(mut multipart: Multipart, max_files: usize) -> AppResult<Self> {
        let mut form = ReportForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();

            if name == FILES_FIELD {
                if form.files.len() >= max_files {
                    return Err(PipelineError::TooManyFiles {
                        max: max_files,
                        got: form.files.len() + 1,
                    }
                    .into());
                }
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?.to_vec();
                debug!(?file_name, ?content_type, size = bytes.len(), "file part received");
                form.files.push(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
                continue;
            }

            let value = field.text().await?;
            form.set(&name, value)?;
        }
        Ok(form)
    }

    fn set(&mut self, name: &str, value: String) -> AppResult<()> {
        let f = &mut self.fields;
        match name {
            "familyMember" => f.family_member = Some(value),
            "title" => f.title = Some(value),
            "testName" => f.test_name = Some(value),
            "hospitalOrLab" => f.hospital_or_lab = Some(value),
            "doctorName" => f.doctor_name = Some(value),
            "additionalNotes" => f.additional_notes = Some(value),
            "date" => f.date = parse_date(&value)?,
            "price" => f.price = parse_number("price", &value)?,
            "bpSystolic" => f.bp_systolic = parse_number("bpSystolic", &value)?,
            "bpDiastolic" => f.bp_diastolic = parse_number("bpDiastolic", &value)?,
            "temperature" => f.temperature = parse_number("temperature", &value)?,
            "fastingSugar" => f.fasting_sugar = parse_number("fastingSugar", &value)?,
            "height" => f.height = parse_number("height", &value)?,
            "weight" => f.weight = parse_number("weight", &value)?,
            "rerunAI" => self.rerun_ai = value.trim().eq_ignore_ascii_case("true"),
            "lang" => self.lang = Some(value.trim().to_owned()).filter(|l| !l.is_empty()),
            other => debug!(field = other, "ignoring unknown form field"),
        }
        Ok(())
    }
}

/// Blank means "not provided".
fn parse_number(field: &'static str, raw: &str) -> AppResult<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(AppError::validation(field, "must be a number")),
    }
}

/// `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_date(raw: &str) -> AppResult<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map(Some)
        .map_err(|_| AppError::validation("date", "expected YYYY-MM-DD or an RFC 3339 timestamp"))
}
