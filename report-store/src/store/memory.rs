use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    errors::StoreError,
    model::{Report, ReportPatch},
    store::{ReportStore, StoreFuture},
};

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryReportStore {
    docs: RwLock<HashMap<String, Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }
}

impl ReportStore for MemoryReportStore {
    fn create(&self, report: Report) -> StoreFuture<'_, String> {
        Box::pin(async move {
            let mut docs = self.docs.write().await;
            if docs.contains_key(&report.id) {
                return Err(StoreError::Duplicate(report.id));
            }
            let id = report.id.clone();
            debug!(report_id = %id, "memory store: insert");
            docs.insert(id.clone(), report);
            Ok(id)
        })
    }

    fn get<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Report>> {
        Box::pin(async move { Ok(self.docs.read().await.get(id).cloned()) })
    }

    fn update<'a>(&'a self, id: &'a str, patch: ReportPatch) -> StoreFuture<'a, Option<Report>> {
        Box::pin(async move {
            let mut docs = self.docs.write().await;
            Ok(docs.get_mut(id).map(|report| {
                patch.apply(report);
                report.clone()
            }))
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.docs.write().await.remove(id).is_some()) })
    }

    fn list_by_member<'a>(&'a self, family_member: &'a str) -> StoreFuture<'a, Vec<Report>> {
        Box::pin(async move {
            let docs = self.docs.read().await;
            let mut out: Vec<Report> = docs
                .values()
                .filter(|r| r.metadata.family_member == family_member)
                .cloned()
                .collect();
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(out)
        })
    }
}
