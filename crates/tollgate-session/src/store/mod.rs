//! Durable session store.
//!
//! One record per issued access/refresh pair. Records authorize rotation; they are
//! never consulted by verification.

pub mod sqlite;

use crate::error::SessionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use sqlite::SqliteSessionStore;

/// Persisted pairing of an access and a refresh credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub subject: String,
    /// Secured token embedded in the access credential.
    pub identifier: String,
    pub access_credential: String,
    pub refresh_credential: String,
    pub issued_at: DateTime<Utc>,
}

/// Selects the record to delete.
#[derive(Debug, Clone, Copy)]
pub enum RecordMatcher<'a> {
    Identifier(&'a str),
    AccessCredential(&'a str),
}

/// Operations the session engine needs from durable storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a record. Identifier and access credential must be unique.
    async fn create_record(&self, record: &SessionRecord) -> Result<(), SessionError>;

    async fn find_by_access_credential(&self, access_credential: &str) -> Result<Option<SessionRecord>, SessionError>;

    /// Delete the matching record. Returns whether a record was removed.
    async fn delete_record(&self, matcher: RecordMatcher<'_>) -> Result<bool, SessionError>;

    /// Delete every record of a subject. Returns the number removed.
    async fn delete_all_records(&self, subject: &str) -> Result<u64, SessionError>;

    /// Delete every record of a subject except the one for `keep_identifier`.
    async fn delete_all_except(&self, subject: &str, keep_identifier: &str) -> Result<u64, SessionError>;

    /// Delete records issued before `cutoff`. Returns the number removed.
    async fn purge_issued_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionError>;
}
