//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while interpreting configuration or request parameters.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A credential type name outside the supported set.
    #[error("unknown credential type: {0}")]
    UnknownTokenType(String),

    /// A lifetime string that humantime could not parse.
    #[error("invalid duration for {field}: {reason}")]
    InvalidDuration { field: &'static str, reason: String },
}
