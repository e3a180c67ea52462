//! # tollgate-token
//!
//! Cryptographic building blocks for Tollgate credentials.
//!
//! A credential is built in two layers:
//!
//! | Layer | Type | Visible to clients | Protects |
//! |-------|------|--------------------|----------|
//! | **Secured token** | [`PayloadCodec`] output | opaque hex | payload confidentiality and integrity (AES-256-GCM) |
//! | **Signed credential** | [`CredentialSigner`] output | base64 Biscuit | origin and expiry (Ed25519) |
//!
//! The signed credential carries exactly one claim, `identifier(<secured token>)`,
//! plus a time check. Everything else about the principal lives inside the
//! encrypted identifier.

pub mod codec;
pub mod credential;
pub mod error;
pub mod keys;

pub use biscuit_auth::PublicKey;
pub use codec::PayloadCodec;
pub use credential::{CredentialSigner, CredentialVerifier, SignedCredential, VerifiedCredential};
pub use error::TokenError;
pub use keys::KeyPair;
