//! Session lifetime and role configuration.

use crate::error::CoreError;
use crate::payload::TokenType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for credential lifetimes and the role allow-list.
///
/// Lifetimes are humantime strings ("15m", "30d").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of an ordinary access credential.
    #[serde(default = "default_access_ttl")]
    pub access_ttl: String,

    /// Long lifetime, used by refresh credentials and remembered access credentials.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl: String,

    #[serde(default = "default_email_verification_ttl")]
    pub email_verification_ttl: String,

    #[serde(default = "default_password_reset_ttl")]
    pub password_reset_ttl: String,

    /// How often expired registry slots and stale session records are purged.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: String,

    /// Roles that may be bound into a credential.
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,

    /// Role assigned to newly registered users.
    #[serde(default = "default_role")]
    pub default_role: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_ttl: default_access_ttl(),
            refresh_ttl: default_refresh_ttl(),
            email_verification_ttl: default_email_verification_ttl(),
            password_reset_ttl: default_password_reset_ttl(),
            sweep_interval: default_sweep_interval(),
            roles: default_roles(),
            default_role: default_role(),
        }
    }
}

impl SessionConfig {
    /// Parse the configured lifetimes.
    pub fn lifetimes(&self) -> Result<Lifetimes, CoreError> {
        Ok(Lifetimes {
            access: parse("access_ttl", &self.access_ttl)?,
            refresh: parse("refresh_ttl", &self.refresh_ttl)?,
            email_verification: parse("email_verification_ttl", &self.email_verification_ttl)?,
            password_reset: parse("password_reset_ttl", &self.password_reset_ttl)?,
        })
    }

    pub fn sweep_interval(&self) -> Result<Duration, CoreError> {
        parse("sweep_interval", &self.sweep_interval)
    }
}

/// Parsed credential lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetimes {
    pub access: Duration,
    pub refresh: Duration,
    pub email_verification: Duration,
    pub password_reset: Duration,
}

impl Lifetimes {
    /// Lifetime of a credential: the long TTL for refresh or remembered credentials,
    /// otherwise the TTL of the type.
    pub fn for_credential(&self, token_type: TokenType, remember_me: bool) -> Duration {
        if token_type == TokenType::Refresh || remember_me {
            return self.refresh;
        }
        match token_type {
            TokenType::Access => self.access,
            TokenType::Refresh => self.refresh,
            TokenType::EmailVerification => self.email_verification,
            TokenType::PasswordReset => self.password_reset,
        }
    }
}

fn parse(field: &'static str, value: &str) -> Result<Duration, CoreError> {
    humantime::parse_duration(value).map_err(|e| CoreError::InvalidDuration {
        field,
        reason: e.to_string(),
    })
}

fn default_access_ttl() -> String {
    "15m".to_string()
}

fn default_refresh_ttl() -> String {
    "30d".to_string()
}

fn default_email_verification_ttl() -> String {
    "24h".to_string()
}

fn default_password_reset_ttl() -> String {
    "1h".to_string()
}

fn default_sweep_interval() -> String {
    "5m".to_string()
}

fn default_roles() -> Vec<String> {
    vec!["user".to_string(), "admin".to_string()]
}

fn default_role() -> String {
    "user".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lifetimes() {
        let lifetimes = SessionConfig::default().lifetimes().unwrap();
        assert_eq!(lifetimes.access, Duration::from_secs(15 * 60));
        assert_eq!(lifetimes.refresh, Duration::from_secs(30 * 24 * 3600));
    }

    #[test]
    fn test_lifetime_selection() {
        let lifetimes = SessionConfig::default().lifetimes().unwrap();

        assert_eq!(lifetimes.for_credential(TokenType::Access, false), lifetimes.access);
        assert_eq!(lifetimes.for_credential(TokenType::Access, true), lifetimes.refresh);
        assert_eq!(lifetimes.for_credential(TokenType::Refresh, false), lifetimes.refresh);
        assert_eq!(
            lifetimes.for_credential(TokenType::PasswordReset, false),
            lifetimes.password_reset
        );
    }

    #[test]
    fn test_invalid_duration_names_field() {
        let config = SessionConfig {
            refresh_ttl: "forever".to_string(),
            ..Default::default()
        };
        match config.lifetimes() {
            Err(CoreError::InvalidDuration { field, .. }) => assert_eq!(field, "refresh_ttl"),
            other => panic!("expected InvalidDuration, got {other:?}"),
        }
    }

    #[test]
    fn test_role_allow_list() {
        let config = SessionConfig::default();
        assert!(config.roles.iter().any(|r| r == "admin"));
        assert!(!config.roles.iter().any(|r| r == "root"));
    }
}
