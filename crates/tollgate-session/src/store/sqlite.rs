//! SQLite-backed session store.

use super::{RecordMatcher, SessionRecord, SessionStore};
use crate::error::SessionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS session_records (
        identifier TEXT PRIMARY KEY,
        subject TEXT NOT NULL,
        access_credential TEXT NOT NULL UNIQUE,
        refresh_credential TEXT NOT NULL,
        issued_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_session_records_subject ON session_records(subject)",
    "CREATE INDEX IF NOT EXISTS idx_session_records_issued ON session_records(issued_at)",
];

#[derive(Debug, FromRow)]
struct SessionRow {
    subject: String,
    identifier: String,
    access_credential: String,
    refresh_credential: String,
    issued_at: i64,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            subject: row.subject,
            identifier: row.identifier,
            access_credential: row.access_credential,
            refresh_credential: row.refresh_credential,
            issued_at: DateTime::from_timestamp(row.issued_at, 0).unwrap_or_default(),
        }
    }
}

/// Session records in a SQLite database.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Wrap an existing pool. Call [`migrate`](Self::migrate) before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Private in-memory database, for tests and ephemeral deployments.
    ///
    /// The pool is capped at one connection because every SQLite memory connection
    /// is its own database.
    pub async fn in_memory() -> Result<Self, SessionError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Create the table and indexes if they are missing.
    pub async fn migrate(&self) -> Result<(), SessionError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create_record(&self, record: &SessionRecord) -> Result<(), SessionError> {
        sqlx::query(
            "INSERT INTO session_records (identifier, subject, access_credential, refresh_credential, issued_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.identifier)
        .bind(&record.subject)
        .bind(&record.access_credential)
        .bind(&record.refresh_credential)
        .bind(record.issued_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_access_credential(&self, access_credential: &str) -> Result<Option<SessionRecord>, SessionError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT subject, identifier, access_credential, refresh_credential, issued_at
             FROM session_records WHERE access_credential = ?",
        )
        .bind(access_credential)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SessionRecord::from))
    }

    async fn delete_record(&self, matcher: RecordMatcher<'_>) -> Result<bool, SessionError> {
        let query = match matcher {
            RecordMatcher::Identifier(identifier) => {
                sqlx::query("DELETE FROM session_records WHERE identifier = ?").bind(identifier)
            }
            RecordMatcher::AccessCredential(credential) => {
                sqlx::query("DELETE FROM session_records WHERE access_credential = ?").bind(credential)
            }
        };
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_records(&self, subject: &str) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM session_records WHERE subject = ?")
            .bind(subject)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all_except(&self, subject: &str, keep_identifier: &str) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM session_records WHERE subject = ? AND identifier != ?")
            .bind(subject)
            .bind(keep_identifier)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn purge_issued_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM session_records WHERE issued_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
