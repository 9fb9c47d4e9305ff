use crate::error::{FanoutError, Result};
use crate::fingerprint::Fingerprint;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub id: i64,
    pub logical_name: String,
    pub fingerprint: Fingerprint,
    pub size_bytes: u64,
    pub candidate_nodes: Vec<String>,
    pub uploader: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub logical_name: String,
    pub fingerprint: Fingerprint,
    pub size_bytes: u64,
    pub candidate_nodes: Vec<String>,
    pub uploader: String,
}

/// Durable file metadata consumed by the coordinators.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a record and return its id
    async fn insert(&self, record: NewFileRecord) -> Result<i64>;

    async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>>;

    /// All records, newest first
    async fn list_all(&self) -> Result<Vec<FileRecord>>;

    /// Cheap connectivity check for health reporting
    async fn ping(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

pub struct SqliteMetadataStore {
    db_path: PathBuf,
}

impl SqliteMetadataStore {
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { db_path };
        store.init_schema()?;
        Ok(store)
    }

    pub async fn open_with_retry(
        db_path: impl Into<PathBuf>,
        policy: &RetryPolicy,
    ) -> Result<Self> {
        let db_path = db_path.into();
        let max_attempts = policy.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match Self::open(db_path.clone()) {
                Ok(store) => {
                    tracing::info!(
                        "Metadata store ready at {} (attempt {}/{})",
                        db_path.display(),
                        attempt,
                        max_attempts
                    );
                    return Ok(store);
                }
                Err(error) if attempt < max_attempts => {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        "Metadata store open failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(
                        "Metadata store unavailable after {} attempts: {}",
                        max_attempts,
                        error
                    );
                    return Err(error);
                }
            }
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn get_conn(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                logical_name TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                candidate_nodes TEXT NOT NULL,
                uploader TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_files_created_at
             ON files(created_at DESC, id DESC)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_files_fingerprint
             ON files(fingerprint)",
            [],
        )?;

        Ok(())
    }

    fn insert_sync(&self, record: &NewFileRecord) -> Result<i64> {
        let conn = self.get_conn()?;
        let candidates = serde_json::to_string(&record.candidate_nodes)?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        conn.execute(
            "INSERT INTO files (
                logical_name,
                fingerprint,
                size_bytes,
                candidate_nodes,
                uploader,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.logical_name,
                record.fingerprint.to_hex(),
                record.size_bytes as i64,
                candidates,
                record.uploader,
                now,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn get_by_id_sync(&self, id: i64) -> Result<Option<FileRecord>> {
        let conn = self.get_conn()?;

        let row = conn
            .query_row(
                "SELECT id, logical_name, fingerprint, size_bytes, candidate_nodes, uploader, created_at
                 FROM files
                 WHERE id = ?1",
                params![id],
                |row| {
                    Ok(FileRow {
                        id: row.get(0)?,
                        logical_name: row.get(1)?,
                        fingerprint: row.get(2)?,
                        size_bytes: row.get(3)?,
                        candidate_nodes: row.get(4)?,
                        uploader: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )
            .optional()?;

        row.map(decode_file_row).transpose()
    }

    fn list_all_sync(&self) -> Result<Vec<FileRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, logical_name, fingerprint, size_bytes, candidate_nodes, uploader, created_at
             FROM files
             ORDER BY created_at DESC, id DESC",
        )?;

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(decode_file_row(FileRow {
                id: row.get(0)?,
                logical_name: row.get(1)?,
                fingerprint: row.get(2)?,
                size_bytes: row.get(3)?,
                candidate_nodes: row.get(4)?,
                uploader: row.get(5)?,
                created_at: row.get(6)?,
            })?);
        }

        Ok(records)
    }

    fn ping_sync(&self) -> Result<()> {
        let conn = self.get_conn()?;
        let _: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn insert(&self, record: NewFileRecord) -> Result<i64> {
        self.insert_sync(&record)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        self.get_by_id_sync(id)
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>> {
        self.list_all_sync()
    }

    async fn ping(&self) -> Result<()> {
        self.ping_sync()
    }
}

struct FileRow {
    id: i64,
    logical_name: String,
    fingerprint: String,
    size_bytes: i64,
    candidate_nodes: String,
    uploader: String,
    created_at: String,
}

fn decode_file_row(row: FileRow) -> Result<FileRecord> {
    let candidate_nodes: Vec<String> = serde_json::from_str(&row.candidate_nodes)?;
    let fingerprint = Fingerprint::from_hex(&row.fingerprint).map_err(|error| {
        FanoutError::Internal(format!(
            "corrupt fingerprint in files row {}: {}",
            row.id, error
        ))
    })?;

    Ok(FileRecord {
        id: row.id,
        logical_name: row.logical_name,
        fingerprint,
        size_bytes: row.size_bytes.max(0) as u64,
        candidate_nodes,
        uploader: row.uploader,
        created_at: parse_rfc3339(&row.created_at)?,
    })
}

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .map_err(|error| FanoutError::Internal(format!("invalid RFC3339 timestamp: {}", error)))?;
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;

    fn new_record(name: &str, body: &[u8]) -> NewFileRecord {
        NewFileRecord {
            logical_name: name.to_string(),
            fingerprint: fingerprint(body),
            size_bytes: body.len() as u64,
            candidate_nodes: vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
            uploader: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteMetadataStore::open(dir.path().join("files.sqlite3")).unwrap();

        let id = store.insert(new_record("a.txt", b"aaa")).await.unwrap();
        let record = store.get_by_id(id).await.unwrap().unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.logical_name, "a.txt");
        assert_eq!(record.fingerprint, fingerprint(b"aaa"));
        assert_eq!(record.size_bytes, 3);
        assert_eq!(record.candidate_nodes, vec!["s1", "s2", "s3"]);
        assert_eq!(record.uploader, "alice");

        assert!(store.get_by_id(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteMetadataStore::open(dir.path().join("files.sqlite3")).unwrap();

        let first = store.insert(new_record("first", b"1")).await.unwrap();
        let second = store.insert(new_record("second", b"2")).await.unwrap();
        let third = store.insert(new_record("third", b"3")).await.unwrap();

        let ids: Vec<i64> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("files.sqlite3");

        let id = {
            let store = SqliteMetadataStore::open(&path).unwrap();
            store.insert(new_record("keep.bin", b"keep")).await.unwrap()
        };

        let store = SqliteMetadataStore::open_with_retry(&path, &RetryPolicy::default())
            .await
            .unwrap();
        store.ping().await.unwrap();
        assert_eq!(
            store.get_by_id(id).await.unwrap().unwrap().logical_name,
            "keep.bin"
        );
    }

    #[tokio::test]
    async fn test_open_with_retry_gives_up() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let result =
            SqliteMetadataStore::open_with_retry(blocker.join("files.sqlite3"), &policy).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_retry_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
    }
}
