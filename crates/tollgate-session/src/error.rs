//! Error types for the session engine.

use thiserror::Error;
use tollgate_core::CoreError;
use tollgate_token::TokenError;

/// Errors surfaced by issuance, revocation and rotation.
///
/// Verification never returns this type; it collapses every failure into
/// [`Rejected`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad credential type, role or subject at issuance.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Secured token was tampered with or is corrupt.
    #[error("failed to decode secured token")]
    Decode,

    /// Refresh/rotation mismatch, missing session record, or spent single-use token.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The ephemeral registry failed.
    #[error("session registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// The durable session store failed.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    /// Configuration could not be interpreted.
    #[error("configuration error: {0}")]
    Config(#[from] CoreError),

    /// Signing or key handling failed.
    #[error("token error: {0}")]
    Token(TokenError),
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::DecodeFailed => SessionError::Decode,
            other => SessionError::Token(other),
        }
    }
}

impl SessionError {
    /// Infrastructure failures; the whole operation may be retried.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SessionError::RegistryUnavailable(_) | SessionError::StoreUnavailable(_)
        )
    }
}

/// Why a credential was rejected. Only used for logs and tests; callers see one
/// undifferentiated [`Rejected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Signature invalid or credential expired.
    Signature,
    /// Embedded identifier did not decode.
    Undecodable,
    /// Not an access credential.
    WrongType,
    /// Identifier is not live in the registry.
    Revoked,
    /// Registry could not be consulted.
    RegistryUnavailable,
}

/// Verification failure. Maps to a 401 at the serving layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("credential rejected")]
pub struct Rejected {
    reason: RejectReason,
}

impl Rejected {
    pub fn new(reason: RejectReason) -> Self {
        Self { reason }
    }

    pub fn reason(&self) -> RejectReason {
        self.reason
    }
}
