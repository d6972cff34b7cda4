//! Lifecycle of persisted reports: create, merge-update, lookup, delete.
//!
//! Updates to one report id are serialised through a per-id async mutex so
//! concurrent load → merge → save sequences cannot interleave inside the
//! process.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use report_store::{
    AnalysisResult, Report, ReportFields, ReportFile, ReportMetadata, ReportPatch, ReportStore,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::errors::PipelineError;

pub struct RecordManager {
    store: Arc<dyn ReportStore>,
    locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl RecordManager {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Exclusive access to `id` for the lifetime of the guard.
    pub async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, w| w.strong_count() > 0);
            match locks.get(id).and_then(Weak::upgrade) {
                Some(m) => m,
                None => {
                    let m = Arc::new(Mutex::new(()));
                    locks.insert(id.to_owned(), Arc::downgrade(&m));
                    m
                }
            }
        };
        slot.lock_owned().await
    }

    /// Persists a new report without analysis.
    pub async fn create(
        &self,
        metadata: ReportMetadata,
        files: Vec<ReportFile>,
    ) -> Result<Report, PipelineError> {
        let report = Report::new(metadata, files);
        self.store.create(report.clone()).await?;
        info!(report_id = %report.id, files = report.files.len(), "report created");
        Ok(report)
    }

    pub async fn load(&self, id: &str) -> Result<Report, PipelineError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::not_found(id))
    }

    /// `report`'s metadata with the present `fields` applied; `report` is untouched.
    pub fn merged_metadata(
        report: &Report,
        fields: ReportFields,
    ) -> Result<ReportMetadata, PipelineError> {
        let mut metadata = report.metadata.clone();
        fields.apply_to(&mut metadata)?;
        Ok(metadata)
    }

    /// Replaces the metadata and appends `new_files` after the existing ones.
    pub fn merge(report: &mut Report, metadata: ReportMetadata, new_files: Vec<ReportFile>) {
        report.metadata = metadata;
        report.files.extend(new_files);
    }

    /// Writes every mutable part of `report` back to the store.
    pub async fn save(&self, report: &Report) -> Result<Report, PipelineError> {
        let saved = self
            .store
            .update(&report.id, ReportPatch::replace_with(report))
            .await?
            .ok_or_else(|| PipelineError::not_found(&report.id))?;
        debug!(report_id = %saved.id, files = saved.files.len(), "report saved");
        Ok(saved)
    }

    pub async fn set_analysis(
        &self,
        id: &str,
        result: AnalysisResult,
    ) -> Result<Report, PipelineError> {
        self.store
            .update(id, ReportPatch::analysis(result))
            .await?
            .ok_or_else(|| PipelineError::not_found(id))
    }

    pub async fn list_by_member(&self, family_member: &str) -> Result<Vec<Report>, PipelineError> {
        Ok(self.store.list_by_member(family_member).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<(), PipelineError> {
        let _guard = self.lock(id).await;
        if self.store.delete(id).await? {
            info!(report_id = %id, "report deleted");
            Ok(())
        } else {
            Err(PipelineError::not_found(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;
    use report_store::{FileKind, MemoryReportStore};

    use super::*;

    fn metadata() -> ReportMetadata {
        ReportFields {
            family_member: Some("m1".into()),
            title: Some("CBC".into()),
            test_name: Some("Complete Blood Count".into()),
            hospital_or_lab: Some("City Lab".into()),
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..ReportFields::default()
        }
        .into_metadata()
        .unwrap()
    }

    fn file(url: &str, kind: FileKind) -> ReportFile {
        ReportFile {
            url: url.into(),
            kind,
        }
    }

    #[tokio::test]
    async fn merge_appends_and_preserves_prefix() {
        let mgr = RecordManager::new(Arc::new(MemoryReportStore::new()));
        let created = mgr
            .create(metadata(), vec![file("memory://a.pdf", FileKind::Pdf)])
            .await
            .unwrap();

        let mut r = mgr.load(&created.id).await.unwrap();
        let fields = ReportFields {
            doctor_name: Some("Dr. Khan".into()),
            ..ReportFields::default()
        };
        let metadata = RecordManager::merged_metadata(&r, fields).unwrap();
        RecordManager::merge(&mut r, metadata, vec![file("memory://b.png", FileKind::Image)]);
        let saved = mgr.save(&r).await.unwrap();

        assert_eq!(saved.files[0], created.files[0]);
        assert_eq!(saved.files[1].kind, FileKind::Image);
        assert_eq!(saved.metadata.doctor_name, "Dr. Khan");
        assert_eq!(saved.ai_analysis, None);
    }

    #[tokio::test]
    async fn blank_required_field_leaves_report_untouched() {
        let mgr = RecordManager::new(Arc::new(MemoryReportStore::new()));
        let r = mgr.create(metadata(), vec![]).await.unwrap();

        let fields = ReportFields {
            doctor_name: Some("Dr. Khan".into()),
            hospital_or_lab: Some("  ".into()),
            ..ReportFields::default()
        };
        assert!(matches!(
            RecordManager::merged_metadata(&r, fields),
            Err(PipelineError::Validation(_))
        ));
        assert_eq!(mgr.load(&r.id).await.unwrap(), r);
    }

    #[tokio::test]
    async fn missing_reports_are_not_found() {
        let mgr = RecordManager::new(Arc::new(MemoryReportStore::new()));
        assert!(matches!(mgr.load("x").await, Err(PipelineError::NotFound { .. })));
        assert!(matches!(mgr.delete("x").await, Err(PipelineError::NotFound { .. })));
        assert!(matches!(
            mgr.set_analysis("x", AnalysisResult::new("a")).await,
            Err(PipelineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn lock_serialises_same_id_only() {
        let mgr = Arc::new(RecordManager::new(Arc::new(MemoryReportStore::new())));
        let held = mgr.lock("r1").await;

        let other = tokio::time::timeout(Duration::from_millis(50), mgr.lock("r2")).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(Duration::from_millis(50), mgr.lock("r1")).await;
        assert!(same.is_err());

        drop(held);
        let again = tokio::time::timeout(Duration::from_millis(50), mgr.lock("r1")).await;
        assert!(again.is_ok());
    }
}
