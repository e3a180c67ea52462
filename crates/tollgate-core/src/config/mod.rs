//! Configuration types for Tollgate.
//!
//! Every section deserializes with defaults so a partial (or empty) file is valid.
//! Secrets are never given defaults: they are resolved from an environment variable
//! first and a file second.

pub mod keys;
pub mod session;

use std::path::Path;

pub use keys::{CryptoConfig, KeyConfig};
pub use session::{Lifetimes, SessionConfig};

/// Resolve a secret from an environment variable, falling back to a file.
///
/// Returns `Ok(None)` when neither source is configured or present.
pub fn resolve_secret(env_var: Option<&str>, file: Option<&Path>) -> Result<Option<String>, std::io::Error> {
    if let Some(env_var) = env_var {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(Some(value.to_string()));
            }
        }
    }

    if let Some(path) = file {
        if path.exists() {
            let value = std::fs::read_to_string(path)?;
            return Ok(Some(value.trim().to_string()));
        }
    }

    Ok(None)
}
