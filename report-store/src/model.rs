//! Report aggregate and the value types it is built from.
//!
//! JSON uses camelCase to match the HTTP contract (`aiAnalysis`,
//! `familyMember`, `hospitalOrLab`, ...).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

pub const DEFAULT_DOCTOR_NAME: &str = "Not specified";

/// Format of an uploaded artifact; drives extractor dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    /// Maps an upload content type to a kind. Only PDF, JPEG and PNG are accepted.
    ///
    /// ```
    /// use report_store::FileKind;
    /// assert_eq!(FileKind::from_content_type("application/pdf"), Some(FileKind::Pdf));
    /// assert_eq!(FileKind::from_content_type("image/PNG"), Some(FileKind::Image));
    /// assert_eq!(FileKind::from_content_type("text/plain"), None);
    /// ```
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" | "application/x-pdf" => Some(FileKind::Pdf),
            "image/jpeg" | "image/jpg" | "image/pjpeg" | "image/png" => Some(FileKind::Image),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Image => "image",
        }
    }
}

/// Reference to one stored upload. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFile {
    /// Opaque locator into blob storage.
    pub url: String,
    pub kind: FileKind,
}

/// AI-derived summary of a report's first file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated: Option<String>,
}

impl AnalysisResult {
    pub fn new(feedback: impl Into<String>) -> Self {
        Self {
            feedback: feedback.into(),
            translated: None,
        }
    }
}

/// Optional health vitals recorded with a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub bp_systolic: Option<f64>,
    pub bp_diastolic: Option<f64>,
    /// Celsius.
    pub temperature: Option<f64>,
    /// mg/dL.
    pub fasting_sugar: Option<f64>,
    /// cm.
    pub height: Option<f64>,
    /// kg.
    pub weight: Option<f64>,
}

/// Descriptive fields of a report. Always complete once a report exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub family_member: String,
    pub title: String,
    pub test_name: String,
    pub hospital_or_lab: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    pub price: f64,
    pub additional_notes: String,
    #[serde(flatten)]
    pub vitals: Vitals,
}

/// The persisted aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    #[serde(flatten)]
    pub metadata: ReportMetadata,
    /// Upload order; index 0 is the analysis source.
    pub files: Vec<ReportFile>,
    /// `None` until analysis has been attempted.
    pub ai_analysis: Option<AnalysisResult>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// New report with a fresh id and no analysis.
    pub fn new(metadata: ReportMetadata, files: Vec<ReportFile>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            metadata,
            files,
            ai_analysis: None,
            created_at: Utc::now(),
        }
    }

    pub fn first_file(&self) -> Option<&ReportFile> {
        self.files.first()
    }
}

/// Metadata fields as supplied by a request; every field is optional.
///
/// Used both to create a report (required fields must be present) and to
/// update one (present fields replace stored values).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFields {
    pub family_member: Option<String>,
    pub title: Option<String>,
    pub test_name: Option<String>,
    pub hospital_or_lab: Option<String>,
    pub doctor_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub price: Option<f64>,
    pub additional_notes: Option<String>,
    pub bp_systolic: Option<f64>,
    pub bp_diastolic: Option<f64>,
    pub temperature: Option<f64>,
    pub fasting_sugar: Option<f64>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

impl ReportFields {
    /// Builds complete metadata, applying defaults for optional fields.
    ///
    /// # Errors
    /// [`ValidationError`] naming the first missing or blank required field.
    pub fn into_metadata(self) -> Result<ReportMetadata, ValidationError> {
        Ok(ReportMetadata {
            family_member: required("familyMember", self.family_member)?,
            title: required("title", self.title)?,
            test_name: required("testName", self.test_name)?,
            hospital_or_lab: required("hospitalOrLab", self.hospital_or_lab)?,
            date: self.date.ok_or(ValidationError::required("date"))?,
            doctor_name: self
                .doctor_name
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DOCTOR_NAME.to_string()),
            price: self.price.unwrap_or(0.0),
            additional_notes: self.additional_notes.unwrap_or_default(),
            vitals: Vitals {
                bp_systolic: self.bp_systolic,
                bp_diastolic: self.bp_diastolic,
                temperature: self.temperature,
                fasting_sugar: self.fasting_sugar,
                height: self.height,
                weight: self.weight,
            },
        })
    }

    /// Overwrites the fields present in `self`; absent fields are kept.
    ///
    /// # Errors
    /// [`ValidationError`] if a required field is supplied blank. `target` is
    /// left unchanged in that case.
    pub fn apply_to(self, target: &mut ReportMetadata) -> Result<(), ValidationError> {
        let mut next = target.clone();

        if let Some(v) = self.family_member {
            next.family_member = required("familyMember", Some(v))?;
        }
        if let Some(v) = self.title {
            next.title = required("title", Some(v))?;
        }
        if let Some(v) = self.test_name {
            next.test_name = required("testName", Some(v))?;
        }
        if let Some(v) = self.hospital_or_lab {
            next.hospital_or_lab = required("hospitalOrLab", Some(v))?;
        }
        if let Some(v) = self.doctor_name {
            next.doctor_name = v;
        }
        if let Some(v) = self.date {
            next.date = v;
        }
        if let Some(v) = self.price {
            next.price = v;
        }
        if let Some(v) = self.additional_notes {
            next.additional_notes = v;
        }

        let vitals = &mut next.vitals;
        vitals.bp_systolic = self.bp_systolic.or(vitals.bp_systolic);
        vitals.bp_diastolic = self.bp_diastolic.or(vitals.bp_diastolic);
        vitals.temperature = self.temperature.or(vitals.temperature);
        vitals.fasting_sugar = self.fasting_sugar.or(vitals.fasting_sugar);
        vitals.height = self.height.or(vitals.height);
        vitals.weight = self.weight.or(vitals.weight);

        *target = next;
        Ok(())
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ValidationError::required(field)),
    }
}

/// Partial replacement applied by [`crate::ReportStore::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPatch {
    pub metadata: Option<ReportMetadata>,
    pub files: Option<Vec<ReportFile>>,
    pub ai_analysis: Option<AnalysisResult>,
}

impl ReportPatch {
    /// Patch that rewrites every mutable part of `report`.
    pub fn replace_with(report: &Report) -> Self {
        Self {
            metadata: Some(report.metadata.clone()),
            files: Some(report.files.clone()),
            ai_analysis: report.ai_analysis.clone(),
        }
    }

    pub fn analysis(result: AnalysisResult) -> Self {
        Self {
            ai_analysis: Some(result),
            ..Self::default()
        }
    }

    pub fn apply(self, report: &mut Report) {
        if let Some(m) = self.metadata {
            report.metadata = m;
        }
        if let Some(f) = self.files {
            report.files = f;
        }
        if let Some(a) = self.ai_analysis {
            report.ai_analysis = Some(a);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_fields() -> ReportFields {
        ReportFields {
            family_member: Some("member-1".into()),
            title: Some("  CBC  ".into()),
            test_name: Some("Complete Blood Count".into()),
            hospital_or_lab: Some("City Lab".into()),
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..ReportFields::default()
        }
    }

    #[test]
    fn create_applies_defaults_and_trims_title() {
        let m = sample_fields().into_metadata().unwrap();
        assert_eq!(m.title, "CBC");
        assert_eq!(m.doctor_name, DEFAULT_DOCTOR_NAME);
        assert_eq!(m.price, 0.0);
        assert_eq!(m.additional_notes, "");
        assert_eq!(m.vitals, Vitals::default());
    }

    #[test]
    fn create_reports_first_missing_required_field() {
        let mut f = sample_fields();
        f.test_name = Some("   ".into());
        assert_eq!(
            f.into_metadata().unwrap_err(),
            ValidationError::required("testName")
        );

        let mut f = sample_fields();
        f.date = None;
        assert_eq!(f.into_metadata().unwrap_err().field, "date");
    }

    #[test]
    fn update_replaces_only_present_fields() {
        let mut m = sample_fields().into_metadata().unwrap();
        m.vitals.weight = Some(70.0);

        let patch = ReportFields {
            title: Some("Lipid panel".into()),
            price: Some(1500.0),
            height: Some(172.0),
            ..ReportFields::default()
        };
        patch.apply_to(&mut m).unwrap();

        assert_eq!(m.title, "Lipid panel");
        assert_eq!(m.price, 1500.0);
        assert_eq!(m.test_name, "Complete Blood Count");
        assert_eq!(m.vitals.height, Some(172.0));
        assert_eq!(m.vitals.weight, Some(70.0));
    }

    #[test]
    fn blank_required_field_on_update_leaves_metadata_untouched() {
        let mut m = sample_fields().into_metadata().unwrap();
        let before = m.clone();
        let patch = ReportFields {
            price: Some(10.0),
            hospital_or_lab: Some("".into()),
            ..ReportFields::default()
        };
        assert!(patch.apply_to(&mut m).is_err());
        assert_eq!(m, before);
    }

    #[test]
    fn report_json_is_camel_case_and_flat() {
        let mut r = Report::new(
            sample_fields().into_metadata().unwrap(),
            vec![ReportFile {
                url: "memory://a.pdf".into(),
                kind: FileKind::Pdf,
            }],
        );
        r.metadata.vitals.bp_systolic = Some(120.0);
        let json = serde_json::to_value(&r).unwrap();

        assert_eq!(json["familyMember"], "member-1");
        assert_eq!(json["hospitalOrLab"], "City Lab");
        assert_eq!(json["bpSystolic"], 120.0);
        assert_eq!(json["date"], "2024-05-01");
        assert_eq!(json["files"][0]["kind"], "pdf");
        assert!(json["aiAnalysis"].is_null());

        let back: Report = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn patch_keeps_analysis_when_not_supplied() {
        let mut r = Report::new(sample_fields().into_metadata().unwrap(), vec![]);
        r.ai_analysis = Some(AnalysisResult::new("old"));
        ReportPatch {
            files: Some(vec![]),
            ..ReportPatch::default()
        }
        .apply(&mut r);
        assert_eq!(r.ai_analysis, Some(AnalysisResult::new("old")));
    }
}
