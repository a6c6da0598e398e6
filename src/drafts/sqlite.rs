/*!
 * SQLite-backed draft store.
 *
 * Persists drafts across restarts so queued translations survive the
 * process. Access goes through a single mutex-guarded connection with
 * async-safe wrappers using tokio's spawn_blocking; holding the connection
 * lock for the whole read-modify-write is what makes the conditional update
 * atomic.
 */

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, params};

use super::store::{DEFAULT_MAX_PER_USER, DEFAULT_RETENTION_HOURS, DraftPatch, DraftStore};
use super::{DraftStatus, OfflineDraft};

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "polyroute.db";

/// Default database directory name under the user's data directory
const DEFAULT_DB_DIRNAME: &str = "polyroute";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS drafts (
    id                TEXT PRIMARY KEY,
    user_id           TEXT NOT NULL,
    tenant_id         TEXT NOT NULL,
    text              TEXT NOT NULL,
    target_language   TEXT NOT NULL,
    status            TEXT NOT NULL,
    attempts          INTEGER NOT NULL DEFAULT 0,
    last_error_code   TEXT,
    last_error_reason TEXT,
    next_attempt_at   TEXT,
    result_text       TEXT,
    created_at        TEXT NOT NULL,
    completed_at      TEXT
);
CREATE INDEX IF NOT EXISTS idx_drafts_status ON drafts (status);
CREATE INDEX IF NOT EXISTS idx_drafts_user ON drafts (user_id, created_at);
"#;

/// Draft store backed by a SQLite database
pub struct SqliteDraftStore {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
    max_per_user: usize,
    retention: ChronoDuration,
}

impl SqliteDraftStore {
    /// Open (or create) the store at the default location
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (or create) the store at the given path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening draft database at: {:?}", db_path);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
            max_per_user: DEFAULT_MAX_PER_USER,
            retention: ChronoDuration::hours(DEFAULT_RETENTION_HOURS),
        })
    }

    /// In-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory draft database");
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
            max_per_user: DEFAULT_MAX_PER_USER,
            retention: ChronoDuration::hours(DEFAULT_RETENTION_HOURS),
        })
    }

    pub fn with_limits(mut self, max_per_user: usize, retention_hours: i64) -> Self {
        self.max_per_user = max_per_user;
        self.retention = ChronoDuration::hours(retention_hours);
        self
    }

    /// Default database path under the user's data directory
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run a database operation on the blocking pool
    async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;
            f(&conn)
        })
        .await
        .context("Database task panicked")?
    }

    fn row_to_draft(row: &rusqlite::Row<'_>) -> rusqlite::Result<OfflineDraft> {
        let status: String = row.get(5)?;
        Ok(OfflineDraft {
            id: row.get(0)?,
            user_id: row.get(1)?,
            tenant_id: row.get(2)?,
            text: row.get(3)?,
            target_language: row.get(4)?,
            status: DraftStatus::from_str(&status).unwrap_or(DraftStatus::Pending),
            attempts: row.get(6)?,
            last_error_code: row.get(7)?,
            last_error_reason: row.get(8)?,
            next_attempt_at: parse_timestamp(row.get::<_, Option<String>>(9)?),
            result_text: row.get(10)?,
            created_at: parse_timestamp(Some(row.get::<_, String>(11)?)).unwrap_or_else(Utc::now),
            completed_at: parse_timestamp(row.get::<_, Option<String>>(12)?),
        })
    }

    fn insert_draft(conn: &Connection, draft: &OfflineDraft) -> Result<()> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO drafts (
                id, user_id, tenant_id, text, target_language, status, attempts,
                last_error_code, last_error_reason, next_attempt_at, result_text,
                created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                draft.id,
                draft.user_id,
                draft.tenant_id,
                draft.text,
                draft.target_language,
                draft.status.to_string(),
                draft.attempts,
                draft.last_error_code,
                draft.last_error_reason,
                draft.next_attempt_at.map(|t| t.to_rfc3339()),
                draft.result_text,
                draft.created_at.to_rfc3339(),
                draft.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn get_draft_sync(
        conn: &Connection,
        user_id: &str,
        draft_id: &str,
    ) -> Result<Option<OfflineDraft>> {
        let draft = conn
            .query_row(
                r#"
                SELECT id, user_id, tenant_id, text, target_language, status, attempts,
                       last_error_code, last_error_reason, next_attempt_at, result_text,
                       created_at, completed_at
                FROM drafts WHERE id = ?1 AND user_id = ?2
                "#,
                params![draft_id, user_id],
                Self::row_to_draft,
            )
            .optional()?;
        Ok(draft)
    }
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[async_trait]
impl DraftStore for SqliteDraftStore {
    async fn save(&self, draft: OfflineDraft) -> Result<OfflineDraft> {
        let max_per_user = self.max_per_user;
        let stored = draft.clone();

        self.execute_async(move |conn| {
            // The incoming draft's own id is excluded: re-saving replaces the
            // row rather than adding one.
            let count: usize = conn.query_row(
                "SELECT COUNT(*) FROM drafts WHERE user_id = ?1 AND id != ?2",
                params![draft.user_id, draft.id],
                |row| row.get(0),
            )?;

            if count >= max_per_user {
                let to_evict = count + 1 - max_per_user;
                conn.execute(
                    r#"
                    DELETE FROM drafts WHERE id IN (
                        SELECT id FROM drafts WHERE user_id = ?1 AND id != ?3
                        ORDER BY created_at ASC LIMIT ?2
                    )
                    "#,
                    params![draft.user_id, to_evict, draft.id],
                )?;
                debug!("Evicted {} draft(s) for user {}", to_evict, draft.user_id);
            }

            Self::insert_draft(conn, &draft)
        })
        .await?;

        Ok(stored)
    }

    async fn get(&self, user_id: &str, draft_id: &str) -> Result<Option<OfflineDraft>> {
        let user_id = user_id.to_string();
        let draft_id = draft_id.to_string();
        self.execute_async(move |conn| Self::get_draft_sync(conn, &user_id, &draft_id))
            .await
    }

    async fn list_pending(&self) -> Result<Vec<OfflineDraft>> {
        self.execute_async(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, user_id, tenant_id, text, target_language, status, attempts,
                       last_error_code, last_error_reason, next_attempt_at, result_text,
                       created_at, completed_at
                FROM drafts WHERE status = 'pending'
                ORDER BY created_at ASC
                "#,
            )?;
            let drafts = stmt
                .query_map([], Self::row_to_draft)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(drafts)
        })
        .await
    }

    async fn update_if_status(
        &self,
        user_id: &str,
        draft_id: &str,
        expected: DraftStatus,
        patch: DraftPatch,
    ) -> Result<bool> {
        let user_id = user_id.to_string();
        let draft_id = draft_id.to_string();

        // The connection lock serializes the whole read-modify-write, which
        // gives the conditional update its atomicity.
        self.execute_async(move |conn| {
            let Some(mut draft) = Self::get_draft_sync(conn, &user_id, &draft_id)? else {
                return Ok(false);
            };
            if draft.status != expected {
                return Ok(false);
            }
            patch.apply_to(&mut draft);
            Self::insert_draft(conn, &draft)?;
            Ok(true)
        })
        .await
    }

    async fn prune_expired(&self) -> Result<usize> {
        let cutoff = (self.now() - self.retention).to_rfc3339();
        self.execute_async(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM drafts WHERE created_at < ?1",
                params![cutoff],
            )?;
            Ok(deleted)
        })
        .await
    }
}
