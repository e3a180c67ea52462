//! The principal payload bound into every credential.
//!
//! A payload never travels in the clear: the codec encrypts it into a secured
//! token, and only that opaque string is embedded in a signed credential.

use crate::error::CoreError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of credential a payload was issued as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenType {
    /// Session authenticator presented on every protected request.
    Access,
    /// Long-lived credential that may only be exchanged for a new pair.
    Refresh,
    /// Single-use credential proving control of an email address.
    EmailVerification,
    /// Single-use credential authorizing a password change.
    PasswordReset,
}

impl TokenType {
    pub const ALL: [TokenType; 4] = [
        TokenType::Access,
        TokenType::Refresh,
        TokenType::EmailVerification,
        TokenType::PasswordReset,
    ];

    /// Wire name of the type, as stamped into payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::EmailVerification => "emailVerification",
            TokenType::PasswordReset => "passwordReset",
        }
    }

    /// Whether this type is redeemed once through a pending-token slot.
    pub fn is_single_use(&self) -> bool {
        matches!(self, TokenType::EmailVerification | TokenType::PasswordReset)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownTokenType(s.to_string()))
    }
}

/// Logical identity bound into a credential.
///
/// `token_type`, `remember_me`, `role` and `iat` are stamped by the issuer; callers
/// fill in the subject, display attributes and request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalPayload {
    /// Subject the session belongs to.
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Issue time, unix seconds.
    #[serde(default)]
    pub iat: i64,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenType>,

    #[serde(default)]
    pub remember_me: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// User agent of the client that logged in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Network origin of the client that logged in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl PrincipalPayload {
    /// Create a payload for a subject with no attributes.
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            name: None,
            email: None,
            iat: 0,
            token_type: None,
            remember_me: false,
            role: None,
            device: None,
            origin: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Issue time as a timestamp, if it is representable.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    /// Drop the issuer-stamped fields, leaving what the caller originally supplied.
    pub fn into_identity(mut self) -> Self {
        self.token_type = None;
        self.remember_me = false;
        self.role = None;
        self.iat = 0;
        self
    }
}
