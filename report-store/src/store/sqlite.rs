//! SQLite-backed document store.
//!
//! Each report is one JSON document in `reports.body`. `family_member` and
//! `created_at` are copied into their own columns for the listing query.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::SecondsFormat;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::{
    errors::StoreError,
    model::{Report, ReportPatch},
    store::{ReportStore, StoreFuture},
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS reports (
    id            TEXT PRIMARY KEY,
    family_member TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    body          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS reports_by_member ON reports (family_member, created_at);
";

#[derive(Clone)]
pub struct SqliteReportStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReportStore {
    /// Opens (or creates) the database file at `path` and ensures the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "sqlite report store opened");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut guard)
        })
        .await?
    }
}

fn created_key(report: &Report) -> String {
    report
        .created_at
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn load(conn: &Connection, id: &str) -> Result<Option<Report>, StoreError> {
    let body: Option<String> = conn
        .query_row("SELECT body FROM reports WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
        .transpose()
}

impl ReportStore for SqliteReportStore {
    fn create(&self, report: Report) -> StoreFuture<'_, String> {
        Box::pin(self.blocking(move |conn| {
            let body = serde_json::to_string(&report)?;
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO reports (id, family_member, created_at, body)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    report.id,
                    report.metadata.family_member,
                    created_key(&report),
                    body
                ],
            )?;
            if inserted == 0 {
                return Err(StoreError::Duplicate(report.id));
            }
            debug!(report_id = %report.id, "sqlite store: insert");
            Ok(report.id)
        }))
    }

    fn get<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Report>> {
        let id = id.to_owned();
        Box::pin(self.blocking(move |conn| load(conn, &id)))
    }

    fn update<'a>(&'a self, id: &'a str, patch: ReportPatch) -> StoreFuture<'a, Option<Report>> {
        let id = id.to_owned();
        Box::pin(self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut report) = load(&tx, &id)? else {
                return Ok(None);
            };
            patch.apply(&mut report);
            tx.execute(
                "UPDATE reports SET family_member = ?2, body = ?3 WHERE id = ?1",
                params![
                    id,
                    report.metadata.family_member,
                    serde_json::to_string(&report)?
                ],
            )?;
            tx.commit()?;
            Ok(Some(report))
        }))
    }

    fn delete<'a>(&'a self, id: &'a str) -> StoreFuture<'a, bool> {
        let id = id.to_owned();
        Box::pin(self.blocking(move |conn| {
            let n = conn.execute("DELETE FROM reports WHERE id = ?1", params![id])?;
            Ok(n > 0)
        }))
    }

    fn list_by_member<'a>(&'a self, family_member: &'a str) -> StoreFuture<'a, Vec<Report>> {
        let member = family_member.to_owned();
        Box::pin(self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT body FROM reports WHERE family_member = ?1 ORDER BY created_at DESC",
            )?;
            let bodies = stmt
                .query_map(params![member], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            bodies
                .iter()
                .map(|b| serde_json::from_str(b).map_err(StoreError::from))
                .collect()
        }))
    }
}
