//! Durable record of every submission: status, worker attribution,
//! stdout/stderr, exit code, timings, timestamps. Backed by SQLite
//! (`rusqlite`, bundled) rather than a network database service, matching
//! this system's preference for embedded, operator-free local state.
//!
//! Concurrency discipline: a single connection guarded by a
//! `tokio::sync::Mutex`. SQLite serializes writers regardless; WAL mode is
//! enabled so a `Gateway` read never blocks behind an in-flight write.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use judge_core::{JobStatus, Language};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;

#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    pub id: String,
    pub source_code: String,
    pub language: Language,
    pub stdin: Option<String>,
    pub status: JobStatus,
    pub worker_id: Option<i64>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub exit_code: Option<i32>,
    pub execution_time_ms: Option<u64>,
    pub memory_usage_kb: Option<u64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// The terminal result fields a worker writes back after a `RunOutcome`.
#[derive(Clone, Debug, Default)]
pub struct TerminalResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub exit_code: Option<i32>,
    pub execution_time_ms: Option<u64>,
    pub memory_usage_kb: Option<u64>,
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ListFilter {
    pub status: Option<JobStatus>,
    pub limit: i64,
    pub offset: i64,
}

pub struct ListPage {
    pub items: Vec<Job>,
    pub total: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("job '{0}' not found")]
    NotFound(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Clone)]
pub struct JobStore {
    conn: Arc<Mutex<Connection>>,
}

impl JobStore {
    /// Opens (creating if absent) the SQLite file at `path` and ensures the
    /// schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, used by tests and by `judge-server` health checks
    /// that do not need to persist across restarts.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                source_code TEXT NOT NULL,
                language TEXT NOT NULL,
                stdin TEXT,
                status TEXT NOT NULL,
                worker_id INTEGER,
                stdout TEXT,
                stderr TEXT,
                compile_output TEXT,
                exit_code INTEGER,
                execution_time_ms INTEGER,
                memory_usage_kb INTEGER,
                error_message TEXT,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
            CREATE INDEX IF NOT EXISTS idx_jobs_worker_id ON jobs(worker_id);",
        )?;
        Ok(())
    }

    /// Inserts a freshly submitted job with status PENDING.
    pub async fn insert(&self, id: &str, source_code: &str, language: Language, stdin: Option<&str>) -> Result<Job, StoreError> {
        let now = Utc::now();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO jobs (id, source_code, language, stdin, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                id,
                source_code,
                language.as_str(),
                stdin,
                JobStatus::Pending.as_str(),
                now.to_rfc3339(),
            ],
        )?;
        Ok(Job {
            id: id.to_string(),
            source_code: source_code.to_string(),
            language,
            stdin: stdin.map(str::to_string),
            status: JobStatus::Pending,
            worker_id: None,
            stdout: None,
            stderr: None,
            compile_output: None,
            exit_code: None,
            execution_time_ms: None,
            memory_usage_kb: None,
            error_message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Job, StoreError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row("SELECT * FROM jobs WHERE id = ?1", params![id], row_to_job)
            .optional()?;
        row.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub async fn list(&self, filter: &ListFilter) -> Result<ListPage, StoreError> {
        let conn = self.conn.lock().await;
        let limit = if filter.limit <= 0 { 10 } else { filter.limit };
        let offset = filter.offset.max(0);

        let (items, total) = match &filter.status {
            Some(status) => {
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM jobs WHERE status = ?1",
                    params![status.as_str()],
                    |r| r.get(0),
                )?;
                let mut stmt = conn.prepare(
                    "SELECT * FROM jobs WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                )?;
                let items = stmt
                    .query_map(params![status.as_str(), limit, offset], row_to_job)?
                    .collect::<Result<Vec<_>, _>>()?;
                (items, total)
            }
            None => {
                let total: i64 = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?;
                let mut stmt =
                    conn.prepare("SELECT * FROM jobs ORDER BY created_at DESC LIMIT ?1 OFFSET ?2")?;
                let items = stmt
                    .query_map(params![limit, offset], row_to_job)?
                    .collect::<Result<Vec<_>, _>>()?;
                (items, total)
            }
        };

        Ok(ListPage { items, total })
    }

    /// Atomically claims a PENDING job for `worker_id`, marking it
    /// PROCESSING and stamping `started_at`. Returns the updated job.
    pub async fn claim(&self, id: &str, worker_id: i64) -> Result<Job, StoreError> {
        let now = Utc::now();
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE jobs SET status = ?1, worker_id = ?2, started_at = ?3, updated_at = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                JobStatus::Processing.as_str(),
                worker_id,
                now.to_rfc3339(),
                id,
                JobStatus::Pending.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        conn.query_row("SELECT * FROM jobs WHERE id = ?1", params![id], row_to_job)
            .map_err(StoreError::from)
    }

    /// Writes the terminal status and result fields for a PROCESSING job.
    pub async fn complete(&self, id: &str, status: JobStatus, result: TerminalResult) -> Result<(), StoreError> {
        debug_assert!(status.is_terminal(), "complete() requires a terminal status");
        let now = Utc::now();
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE jobs SET status = ?1, stdout = ?2, stderr = ?3, compile_output = ?4,
                exit_code = ?5, execution_time_ms = ?6, memory_usage_kb = ?7,
                error_message = ?8, completed_at = ?9, updated_at = ?9
             WHERE id = ?10",
            params![
                status.as_str(),
                result.stdout,
                result.stderr,
                result.compile_output,
                result.exit_code,
                result.execution_time_ms.map(|v| v as i64),
                result.memory_usage_kb.map(|v| v as i64),
                result.error_message,
                now.to_rfc3339(),
                id,
            ],
        )?;
        Ok(())
    }

    /// Counts jobs per status, used by the health report.
    pub async fn count_by_status(&self) -> Result<HashMap<JobStatus, i64>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;
        let rows = stmt.query_map([], |r| {
            let status: String = r.get(0)?;
            let count: i64 = r.get(1)?;
            Ok((status, count))
        })?;
        let mut counts = HashMap::new();
        for row in rows {
            let (status, count) = row?;
            if let Ok(status) = status.parse::<JobStatus>() {
                counts.insert(status, count);
            }
        }
        Ok(counts)
    }

    /// A trivial liveness ping for the health report.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let language_str: String = row.get("language")?;
    let status_str: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let started_at: Option<String> = row.get("started_at")?;
    let completed_at: Option<String> = row.get("completed_at")?;

    Ok(Job {
        id: row.get("id")?,
        source_code: row.get("source_code")?,
        language: language_str.parse().unwrap_or(Language::Python3),
        stdin: row.get("stdin")?,
        status: status_str.parse().unwrap_or(JobStatus::Failed),
        worker_id: row.get("worker_id")?,
        stdout: row.get("stdout")?,
        stderr: row.get("stderr")?,
        compile_output: row.get("compile_output")?,
        exit_code: row.get("exit_code")?,
        execution_time_ms: row.get::<_, Option<i64>>("execution_time_ms")?.map(|v| v as u64),
        memory_usage_kb: row.get::<_, Option<i64>>("memory_usage_kb")?.map(|v| v as u64),
        error_message: row.get("error_message")?,
        created_at: parse_rfc3339(&created_at),
        started_at: started_at.as_deref().map(parse_rfc3339),
        completed_at: completed_at.as_deref().map(parse_rfc3339),
        updated_at: parse_rfc3339(&updated_at),
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = JobStore::open_in_memory().unwrap();
        let job = store.insert("job-1", "print(1)", Language::Python3, None).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);

        let fetched = store.get("job-1").await.unwrap();
        assert_eq!(fetched.source_code, "print(1)");
        assert_eq!(fetched.language, Language::Python3);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = JobStore::open_in_memory().unwrap();
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn claim_sets_worker_and_started_at() {
        let store = JobStore::open_in_memory().unwrap();
        store.insert("job-1", "code", Language::Go, None).await.unwrap();
        let claimed = store.claim("job-1", 3).await.unwrap();
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(claimed.worker_id, Some(3));
        assert!(claimed.started_at.is_some());
    }

    #[tokio::test]
    async fn claim_twice_fails_second_time() {
        let store = JobStore::open_in_memory().unwrap();
        store.insert("job-1", "code", Language::Go, None).await.unwrap();
        store.claim("job-1", 1).await.unwrap();
        let err = store.claim("job-1", 2).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn complete_writes_terminal_fields() {
        let store = JobStore::open_in_memory().unwrap();
        store.insert("job-1", "code", Language::Rust, None).await.unwrap();
        store.claim("job-1", 1).await.unwrap();
        store
            .complete(
                "job-1",
                JobStatus::Completed,
                TerminalResult {
                    stdout: Some("hi\n".into()),
                    exit_code: Some(0),
                    execution_time_ms: Some(42),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let job = store.get("job-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.stdout.as_deref(), Some("hi\n"));
        assert_eq!(job.exit_code, Some(0));
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn list_orders_by_created_at_desc_and_paginates() {
        let store = JobStore::open_in_memory().unwrap();
        for i in 0..3 {
            store.insert(&format!("job-{i}"), "code", Language::C, None).await.unwrap();
        }
        let page = store.list(&ListFilter { status: None, limit: 2, offset: 0 }).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "job-2");
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = JobStore::open_in_memory().unwrap();
        store.insert("a", "code", Language::C, None).await.unwrap();
        store.insert("b", "code", Language::C, None).await.unwrap();
        store.claim("a", 1).await.unwrap();
        store
            .complete("a", JobStatus::Completed, TerminalResult::default())
            .await
            .unwrap();

        let page = store
            .list(&ListFilter { status: Some(JobStatus::Completed), limit: 10, offset: 0 })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, "a");
    }

    #[tokio::test]
    async fn count_by_status_reflects_rows() {
        let store = JobStore::open_in_memory().unwrap();
        store.insert("a", "code", Language::C, None).await.unwrap();
        store.insert("b", "code", Language::C, None).await.unwrap();
        let counts = store.count_by_status().await.unwrap();
        assert_eq!(counts.get(&JobStatus::Pending), Some(&2));
    }

    #[tokio::test]
    async fn ping_succeeds() {
        let store = JobStore::open_in_memory().unwrap();
        store.ping().await.unwrap();
    }

    #[test]
    fn open_creates_file_backed_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");
        let store = JobStore::open(&path).unwrap();
        drop(store);
        assert!(path.exists());
    }
}
