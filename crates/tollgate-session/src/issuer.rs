//! Credential issuance.

use crate::context::SessionContext;
use crate::error::SessionError;
use crate::registry::keys;
use crate::sessions;
use crate::store::SessionRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tollgate_core::{PrincipalPayload, TokenType};

/// A signed credential and the secured token it embeds.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub credential: String,
    pub identifier: String,
    pub token_type: TokenType,
    pub expires_at: DateTime<Utc>,
}

/// Access and refresh credentials of one session.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Identifier of the session, as used by single-session logout.
    pub identifier: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Builds credentials and records them in the registry.
pub struct TokenIssuer {
    ctx: SessionContext,
}

impl TokenIssuer {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Stamp, encrypt and sign a payload, then apply the type's registry side effect.
    ///
    /// - `access`: identifier pushed to the front of the subject's list, liveness
    ///   timestamp set, list TTL extended to the credential lifetime
    /// - `emailVerification` / `passwordReset`: identifier stored as the subject's
    ///   single pending token of that type, superseding any earlier one
    /// - `refresh`: nothing; the caller pairs it with an access credential in a record
    pub async fn issue(
        &self,
        mut payload: PrincipalPayload,
        token_type: TokenType,
        remember_me: bool,
        role: &str,
    ) -> Result<IssuedCredential, SessionError> {
        if payload.sub.trim().is_empty() {
            return Err(SessionError::InvalidParameter("subject is empty".to_string()));
        }
        if !self.ctx.is_role_allowed(role) {
            return Err(SessionError::InvalidParameter(format!("role '{role}' is not allowed")));
        }

        payload.token_type = Some(token_type);
        payload.remember_me = remember_me;
        payload.role = Some(role.to_string());
        payload.iat = Utc::now().timestamp();

        let identifier = self.ctx.codec.encode(&payload)?;
        let lifetime = self.ctx.lifetimes.for_credential(token_type, remember_me);
        let signed = self.ctx.signer.sign(&identifier, lifetime)?;

        match token_type {
            TokenType::Access => self.register_access(&payload.sub, &identifier, lifetime).await?,
            TokenType::EmailVerification | TokenType::PasswordReset => {
                self.ctx
                    .registry
                    .set_with_ttl(&keys::pending(token_type, &payload.sub), &identifier, lifetime)
                    .await?
            }
            TokenType::Refresh => {}
        }

        tracing::debug!(
            subject = %payload.sub,
            token_type = %token_type,
            remember_me,
            "Issued credential"
        );

        Ok(IssuedCredential {
            credential: signed.token,
            identifier,
            token_type,
            expires_at: signed.expires_at,
        })
    }

    /// Issue an access/refresh pair and persist the session record.
    ///
    /// If the record cannot be written, the access identifier is withdrawn from
    /// the registry so no live session exists without a record.
    pub async fn open_session(
        &self,
        payload: PrincipalPayload,
        remember_me: bool,
        role: &str,
    ) -> Result<TokenPair, SessionError> {
        let subject = payload.sub.clone();
        let (access, refresh) = tokio::try_join!(
            self.issue(payload.clone(), TokenType::Access, remember_me, role),
            self.issue(payload, TokenType::Refresh, false, role),
        )?;

        let record = SessionRecord {
            subject: subject.clone(),
            identifier: access.identifier.clone(),
            access_credential: access.credential.clone(),
            refresh_credential: refresh.credential.clone(),
            issued_at: Utc::now(),
        };

        if let Err(err) = self.ctx.store.create_record(&record).await {
            let registry = &self.ctx.registry;
            let list_key = keys::subject_list(&subject);
            let liveness_key = keys::liveness(&access.identifier);
            let cleanup = tokio::try_join!(
                registry.remove(&list_key, &access.identifier),
                registry.delete(&liveness_key),
            );
            if let Err(cleanup_err) = cleanup {
                tracing::warn!(subject = %subject, error = %cleanup_err, "Failed to withdraw unrecorded session");
            }
            return Err(err);
        }

        tracing::info!(subject = %subject, remember_me, "Session opened");

        Ok(TokenPair {
            access_token: access.credential,
            refresh_token: refresh.credential,
            identifier: access.identifier,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        })
    }

    /// Register a live access identifier.
    ///
    /// The liveness key is written before the identifier is listed, so a listed
    /// identifier without one has lapsed and is pruned here.
    async fn register_access(&self, subject: &str, identifier: &str, lifetime: Duration) -> Result<(), SessionError> {
        let registry = &self.ctx.registry;
        let list_key = keys::subject_list(subject);
        let liveness_key = keys::liveness(identifier);
        let now = Utc::now().timestamp().to_string();

        registry.set_with_ttl(&liveness_key, &now, lifetime).await?;
        registry.push_front(&list_key, identifier).await?;
        tokio::try_join!(
            registry.extend_ttl(&list_key, lifetime),
            sessions::prune_lapsed(&self.ctx, subject),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::SessionConfig;

    async fn issuer() -> (TokenIssuer, SessionContext) {
        let ctx = SessionContext::ephemeral(&SessionConfig::default()).await.unwrap();
        (TokenIssuer::new(ctx.clone()), ctx)
    }

    #[tokio::test]
    async fn test_access_issuance_registers_identifier() {
        let (issuer, ctx) = issuer().await;

        let first = issuer
            .issue(PrincipalPayload::new("u1"), TokenType::Access, false, "user")
            .await
            .unwrap();
        let second = issuer
            .issue(PrincipalPayload::new("u1"), TokenType::Access, false, "user")
            .await
            .unwrap();

        let live = ctx.registry.range(&keys::subject_list("u1")).await.unwrap();
        assert_eq!(live, vec![second.identifier.clone(), first.identifier.clone()]);
        assert!(
            ctx.registry
                .get(&keys::liveness(&first.identifier))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_payload_is_stamped() {
        let (issuer, ctx) = issuer().await;

        let issued = issuer
            .issue(PrincipalPayload::new("u1").with_device("cli"), TokenType::Access, true, "admin")
            .await
            .unwrap();

        let payload: PrincipalPayload = ctx.codec.decode(&issued.identifier).unwrap();
        assert_eq!(payload.token_type, Some(TokenType::Access));
        assert!(payload.remember_me);
        assert_eq!(payload.role.as_deref(), Some("admin"));
        assert!(payload.iat > 0);
        assert_eq!(payload.device.as_deref(), Some("cli"));

        let claim = ctx.verifier.verify(&issued.credential).unwrap();
        assert_eq!(claim.identifier, issued.identifier);
    }

    #[tokio::test]
    async fn test_remembered_access_gets_long_lifetime() {
        let (issuer, ctx) = issuer().await;

        let short = issuer
            .issue(PrincipalPayload::new("u1"), TokenType::Access, false, "user")
            .await
            .unwrap();
        let long = issuer
            .issue(PrincipalPayload::new("u1"), TokenType::Access, true, "user")
            .await
            .unwrap();

        let gap = long.expires_at - short.expires_at;
        let expected = ctx.lifetimes.refresh - ctx.lifetimes.access;
        assert!((gap.num_seconds() - expected.as_secs() as i64).abs() <= 2);
    }

    #[tokio::test]
    async fn test_refresh_has_no_registry_side_effect() {
        let (issuer, ctx) = issuer().await;

        issuer
            .issue(PrincipalPayload::new("u1"), TokenType::Refresh, false, "user")
            .await
            .unwrap();

        assert!(ctx.registry.range(&keys::subject_list("u1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_token_superseded() {
        let (issuer, ctx) = issuer().await;

        issuer
            .issue(PrincipalPayload::new("u1"), TokenType::PasswordReset, false, "user")
            .await
            .unwrap();
        let latest = issuer
            .issue(PrincipalPayload::new("u1"), TokenType::PasswordReset, false, "user")
            .await
            .unwrap();

        let pending = ctx
            .registry
            .get(&keys::pending(TokenType::PasswordReset, "u1"))
            .await
            .unwrap();
        assert_eq!(pending, Some(latest.identifier));
    }

    #[tokio::test]
    async fn test_invalid_parameters() {
        let (issuer, _) = issuer().await;

        let bad_role = issuer
            .issue(PrincipalPayload::new("u1"), TokenType::Access, false, "root")
            .await;
        assert!(matches!(bad_role, Err(SessionError::InvalidParameter(_))));

        let no_subject = issuer
            .issue(PrincipalPayload::new(" "), TokenType::Access, false, "user")
            .await;
        assert!(matches!(no_subject, Err(SessionError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_open_session_persists_record() {
        let (issuer, ctx) = issuer().await;

        let pair = issuer
            .open_session(PrincipalPayload::new("u1"), false, "user")
            .await
            .unwrap();

        let record = ctx
            .store
            .find_by_access_credential(&pair.access_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.subject, "u1");
        assert_eq!(record.identifier, pair.identifier);
        assert_eq!(record.refresh_credential, pair.refresh_token);
    }
}
