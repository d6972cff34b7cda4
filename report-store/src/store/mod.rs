//! Document-store seam for [`Report`] aggregates.

pub mod memory;
pub mod sqlite;

use std::{future::Future, pin::Pin};

use crate::{
    errors::StoreError,
    model::{Report, ReportPatch},
};

/// Boxed future returned by [`ReportStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Persistence for reports, keyed by report id.
///
/// Implementations must be safe to share between tasks behind an `Arc`.
pub trait ReportStore: Send + Sync {
    /// Inserts a new report and returns its id.
    fn create(&self, report: Report) -> StoreFuture<'_, String>;

    fn get<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Report>>;

    /// Applies `patch` and returns the stored result, or `None` if no report has `id`.
    fn update<'a>(&'a self, id: &'a str, patch: ReportPatch) -> StoreFuture<'a, Option<Report>>;

    /// Returns `true` if a report was removed.
    fn delete<'a>(&'a self, id: &'a str) -> StoreFuture<'a, bool>;

    /// Reports for one family member, newest first.
    fn list_by_member<'a>(&'a self, family_member: &'a str) -> StoreFuture<'a, Vec<Report>>;
}
