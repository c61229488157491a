//! SQLite storage backend implementation.
//!
//! Each job is one row holding the versioned JSON record plus the columns
//! queries filter and sort on. The schema is versioned in a `schema_version`
//! table and upgraded by ordered migrations when the database is opened.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task;
use tracing::info;

use super::{JobFilter, JobStorage, ListOrder};
use crate::error::{Error, Result};
use crate::job::{JobId, JobRecord, JobState, RECORD_VERSION, Transition};

/// Schema version this build writes.
pub const SCHEMA_VERSION: u32 = 2;

type Migration = fn(&Transaction<'_>) -> Result<()>;

const MIGRATIONS: &[(u32, Migration)] = &[(1, create_jobs_table), (2, add_backend_column)];

/// SQLite storage backend.
#[derive(Clone)]
pub struct SqliteStorage {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) a database file and bring its schema up to date.
    ///
    /// Blocks while migrating; call it before the runtime starts or from
    /// `spawn_blocking`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Private in-memory database, mainly for tests.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        migrate(&mut conn, SCHEMA_VERSION)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Schema version currently recorded in the database.
    pub async fn schema_version(&self) -> Result<u32> {
        self.blocking(|conn| current_version(conn)).await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();
        task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| Error::StorageError("database lock poisoned".into()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| Error::StorageError(format!("task join error: {e}")))?
    }
}

fn current_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?)
}

/// Apply every migration above the recorded version, up to `target`.
fn migrate(conn: &mut Connection, target: u32) -> Result<u32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let current = current_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(Error::StorageError(format!(
            "database schema version {current} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    for (version, migration) in MIGRATIONS
        .iter()
        .filter(|(v, _)| *v > current && *v <= target)
    {
        let tx = conn.transaction()?;
        migration(&tx)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            params![version, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        info!(version, "Applied job store schema migration");
    }

    current_version(conn)
}

fn create_jobs_table(tx: &Transaction<'_>) -> Result<()> {
    tx.execute(
        "CREATE TABLE IF NOT EXISTS jobs (
            job_id TEXT PRIMARY KEY,
            state TEXT NOT NULL,
            record_version INTEGER NOT NULL,
            record_json TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            finished_at INTEGER
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_jobs_created ON jobs(created_at)",
        [],
    )?;
    Ok(())
}

fn add_backend_column(tx: &Transaction<'_>) -> Result<()> {
    tx.execute(
        "ALTER TABLE jobs ADD COLUMN backend TEXT NOT NULL DEFAULT ''",
        [],
    )?;

    let rows: Vec<(String, String)> = {
        let mut stmt = tx.prepare("SELECT job_id, record_json FROM jobs")?;
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?
    };
    for (job_id, json) in rows {
        let record = decode(&json)?;
        tx.execute(
            "UPDATE jobs SET backend = ?1 WHERE job_id = ?2",
            params![record.backend(), job_id],
        )?;
    }

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_jobs_backend ON jobs(backend)",
        [],
    )?;
    Ok(())
}

fn decode(json: &str) -> Result<JobRecord> {
    let record: JobRecord = serde_json::from_str(json)?;
    if record.record_version > RECORD_VERSION {
        return Err(Error::StorageError(format!(
            "job {} has record version {}, newer than supported {RECORD_VERSION}",
            record.id, record.record_version
        )));
    }
    Ok(record)
}

fn finished_micros(record: &JobRecord) -> Option<i64> {
    record.finished_at.map(|t| t.timestamp_micros())
}

#[async_trait]
impl JobStorage for SqliteStorage {
    async fn insert(&self, record: &JobRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        let record = record.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO jobs (job_id, state, backend, record_version, record_json,
                                   created_at, finished_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id.as_str(),
                    record.state.as_str(),
                    record.backend(),
                    record.record_version,
                    json,
                    record.created_at.timestamp_micros(),
                    finished_micros(&record),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>> {
        let id = id.clone();
        self.blocking(move |conn| {
            let json: Option<String> = conn
                .query_row(
                    "SELECT record_json FROM jobs WHERE job_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            json.as_deref().map(decode).transpose()
        })
        .await
    }

    async fn transition(&self, id: &JobId, transition: Transition) -> Result<JobRecord> {
        let id = id.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let json: String = tx
                .query_row(
                    "SELECT record_json FROM jobs WHERE job_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| Error::JobNotFound(id.to_string()))?;

            let mut record = decode(&json)?;
            record.apply(transition, Utc::now())?;

            tx.execute(
                "UPDATE jobs SET state = ?1, record_json = ?2, finished_at = ?3
                 WHERE job_id = ?4",
                params![
                    record.state.as_str(),
                    serde_json::to_string(&record)?,
                    finished_micros(&record),
                    id.as_str(),
                ],
            )?;
            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<JobRecord>> {
        let filter = filter.clone();
        self.blocking(move |conn| {
            let mut query = String::from("SELECT record_json FROM jobs WHERE 1=1");
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(state) = filter.state {
                query.push_str(" AND state = ?");
                params.push(Box::new(state.as_str()));
            }
            if let Some(backend) = filter.backend {
                query.push_str(" AND backend = ?");
                params.push(Box::new(backend));
            }

            query.push_str(match filter.order {
                ListOrder::NewestFirst => " ORDER BY created_at DESC, rowid DESC",
                ListOrder::OldestFirst => " ORDER BY created_at ASC, rowid ASC",
            });
            query.push_str(" LIMIT ?");
            params.push(Box::new(i64::try_from(filter.limit).unwrap_or(i64::MAX)));

            let mut stmt = conn.prepare(&query)?;
            let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt
                .query_map(param_refs.as_slice(), |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.iter().map(|json| decode(json)).collect()
        })
        .await
    }

    async fn delete(&self, id: &JobId) -> Result<bool> {
        let id = id.clone();
        self.blocking(move |conn| {
            let n = conn.execute("DELETE FROM jobs WHERE job_id = ?1", params![id.as_str()])?;
            Ok(n > 0)
        })
        .await
    }

    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.blocking(move |conn| {
            let n = conn.execute(
                "DELETE FROM jobs
                 WHERE state IN ('succeeded', 'failed', 'cancelled')
                   AND finished_at IS NOT NULL AND finished_at < ?1",
                params![cutoff.timestamp_micros()],
            )?;
            Ok(n)
        })
        .await
    }

    async fn count_by_state(&self) -> Result<Vec<(JobState, usize)>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM jobs GROUP BY state")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut counts: Vec<(JobState, usize)> =
                JobState::ALL.into_iter().map(|s| (s, 0)).collect();
            for (state, n) in rows {
                let state: JobState = state
                    .parse()
                    .map_err(|_| Error::StorageError(format!("unknown stored state '{state}'")))?;
                if let Some(entry) = counts.iter_mut().find(|(s, _)| *s == state) {
                    entry.1 = usize::try_from(n).unwrap_or(0);
                }
            }
            Ok(counts)
        })
        .await
    }
}
