//! Ephemeral session registry.
//!
//! The registry is the sole revocation authority: an identifier is live iff it is in
//! its subject's list. Each primitive must be atomic on its own; the engine never
//! relies on multi-key transactions.

pub mod memory;

use crate::error::SessionError;
use async_trait::async_trait;
use std::time::Duration;

pub use memory::MemoryRegistry;

/// Storage primitives the session engine needs from an ephemeral, TTL-based store.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Push a value to the front of a list, creating the list if needed.
    async fn push_front(&self, list_key: &str, value: &str) -> Result<(), SessionError>;

    /// Remove the first occurrence of a value from a list. Returns whether it was present.
    async fn remove(&self, list_key: &str, value: &str) -> Result<bool, SessionError>;

    /// All values of a list, front first. A missing list is empty.
    async fn range(&self, list_key: &str) -> Result<Vec<String>, SessionError>;

    /// Membership test on a list.
    async fn contains(&self, list_key: &str, value: &str) -> Result<bool, SessionError> {
        Ok(self.range(list_key).await?.iter().any(|v| v == value))
    }

    /// Set a string value with a TTL, replacing whatever was stored under the key.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SessionError>;

    /// Read a string value.
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Delete a key of any kind. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, SessionError>;

    /// Delete a string key only if it currently holds `expected`.
    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, SessionError>;

    /// Set the TTL of an existing key. Returns whether the key existed.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, SessionError>;

    /// Like [`expire`](Self::expire) but never shortens an existing TTL. A key with
    /// no TTL receives one.
    async fn extend_ttl(&self, key: &str, ttl: Duration) -> Result<bool, SessionError>;

    /// Drop expired entries eagerly. Stores with native expiry need not override this.
    async fn purge_expired(&self) -> Result<usize, SessionError> {
        Ok(0)
    }
}

/// Key layout shared by every registry backend.
pub mod keys {
    use tollgate_core::TokenType;

    /// List of live identifiers for a subject, most recent first.
    pub fn subject_list(subject: &str) -> String {
        format!("sessions:{subject}")
    }

    /// Last-access timestamp (unix seconds) of an identifier.
    pub fn liveness(identifier: &str) -> String {
        format!("liveness:{identifier}")
    }

    /// Pending single-use token of a given type for a subject.
    pub fn pending(token_type: TokenType, subject: &str) -> String {
        format!("{token_type}_{subject}")
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_key_layout() {
            assert_eq!(subject_list("u1"), "sessions:u1");
            assert_eq!(liveness("ab12"), "liveness:ab12");
            assert_eq!(pending(TokenType::PasswordReset, "u1"), "passwordReset_u1");
        }
    }
}
