//! Error types for the token crate.

use thiserror::Error;

/// Errors that can occur while encoding payloads or handling credentials.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Failed to generate keypair.
    #[error("failed to generate keypair: {0}")]
    KeyGenerationFailed(String),

    /// Failed to parse private key.
    #[error("failed to parse private key: {0}")]
    InvalidPrivateKey(String),

    /// Failed to parse public key.
    #[error("failed to parse public key: {0}")]
    InvalidPublicKey(String),

    /// Payload key is not 32 hex-encoded bytes.
    #[error("invalid payload key: {0}")]
    InvalidPayloadKey(String),

    /// Failed to serialize or encrypt a payload.
    #[error("failed to encode payload: {0}")]
    EncodeFailed(String),

    /// Secured token was tampered with, corrupt, or sealed under another key.
    #[error("failed to decode secured token")]
    DecodeFailed,

    /// Failed to create a signed credential.
    #[error("failed to create credential: {0}")]
    CredentialCreationFailed(String),

    /// Failed to parse a credential or its signature did not verify.
    #[error("failed to parse credential: {0}")]
    CredentialParseFailed(String),

    /// Credential verification failed (expired or policy rejected).
    #[error("credential verification failed: {0}")]
    VerificationFailed(String),

    /// Credential is missing required claim.
    #[error("credential missing required claim: {claim}")]
    MissingClaim { claim: String },

    /// IO error (reading/writing keys).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
