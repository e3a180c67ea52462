//! # tollgate-core
//!
//! Types shared by every Tollgate crate:
//!
//! - [`config`]: session lifetimes, role allow-list, payload-key and signing-key sources
//! - [`payload`]: the principal payload bound into every credential and the
//!   credential types
//! - [`error`]: configuration and parameter errors

pub mod config;
pub mod error;
pub mod payload;

pub use config::{CryptoConfig, KeyConfig, Lifetimes, SessionConfig};
pub use error::CoreError;
pub use payload::{PrincipalPayload, TokenType};
