//! Lab report domain model and document-store seam.
//!
//! [`Report`] is the aggregate persisted by the ingestion pipeline. Storage is
//! reached only through the [`ReportStore`] trait; two adapters ship with the
//! crate: [`MemoryReportStore`] and [`SqliteReportStore`].

pub mod errors;
pub mod model;
pub mod store;

pub use errors::{StoreError, ValidationError};
pub use model::{
    AnalysisResult, FileKind, Report, ReportFields, ReportFile, ReportMetadata, ReportPatch,
    Vitals,
};
pub use store::{
    ReportStore, StoreFuture, memory::MemoryReportStore, sqlite::SqliteReportStore,
};
