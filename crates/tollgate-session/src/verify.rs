//! Per-request credential verification.

use crate::context::SessionContext;
use crate::error::{RejectReason, Rejected};
use crate::registry::keys;
use chrono::Utc;
use serde::Serialize;
use tollgate_core::{PrincipalPayload, TokenType};
use tollgate_token::VerifiedCredential;

/// Authenticated principal attached to a request.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub subject: String,
    /// Secured token of the access credential, identifies the session.
    pub identifier: String,
    pub payload: PrincipalPayload,
}

/// Decides whether a signed access credential is acceptable.
#[derive(Clone)]
pub struct VerificationPipeline {
    ctx: SessionContext,
}

impl VerificationPipeline {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Verify a raw bearer credential: signature and expiry, then [`verify`](Self::verify).
    pub async fn authenticate(&self, bearer: &str) -> Result<Principal, Rejected> {
        let verified = self.ctx.verifier.verify(bearer).map_err(|e| {
            tracing::debug!(error = %e, "Credential signature check failed");
            Rejected::new(RejectReason::Signature)
        })?;
        self.verify(&verified).await
    }

    /// Accept a signature-checked credential iff its identifier decodes to an access
    /// payload and is still live in the registry.
    ///
    /// A registry failure rejects the credential. On success the liveness
    /// timestamp is refreshed in the background.
    pub async fn verify(&self, credential: &VerifiedCredential) -> Result<Principal, Rejected> {
        let identifier = credential.identifier.as_str();

        let payload: PrincipalPayload = self.ctx.codec.decode(identifier).map_err(|_| {
            tracing::debug!("Credential identifier did not decode");
            Rejected::new(RejectReason::Undecodable)
        })?;

        if payload.token_type != Some(TokenType::Access) {
            tracing::debug!(subject = %payload.sub, "Rejected non-access credential");
            return Err(Rejected::new(RejectReason::WrongType));
        }

        let live = self
            .ctx
            .registry
            .contains(&keys::subject_list(&payload.sub), identifier)
            .await
            .map_err(|e| {
                tracing::warn!(subject = %payload.sub, error = %e, "Registry unavailable during verification");
                Rejected::new(RejectReason::RegistryUnavailable)
            })?;

        if !live {
            tracing::debug!(subject = %payload.sub, "Rejected revoked credential");
            return Err(Rejected::new(RejectReason::Revoked));
        }

        self.touch(identifier, &payload);

        Ok(Principal {
            subject: payload.sub.clone(),
            identifier: identifier.to_string(),
            payload,
        })
    }

    fn touch(&self, identifier: &str, payload: &PrincipalPayload) {
        let registry = self.ctx.registry.clone();
        let key = keys::liveness(identifier);
        let ttl = self.ctx.lifetimes.for_credential(TokenType::Access, payload.remember_me);
        let subject = payload.sub.clone();

        tokio::spawn(async move {
            let now = Utc::now().timestamp().to_string();
            if let Err(e) = registry.set_with_ttl(&key, &now, ttl).await {
                tracing::warn!(subject = %subject, error = %e, "Failed to refresh session liveness");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issuer::TokenIssuer;
    use std::time::Duration;
    use tollgate_core::SessionConfig;

    async fn setup() -> (VerificationPipeline, TokenIssuer, SessionContext) {
        let ctx = SessionContext::ephemeral(&SessionConfig::default()).await.unwrap();
        (VerificationPipeline::new(ctx.clone()), TokenIssuer::new(ctx.clone()), ctx)
    }

    #[tokio::test]
    async fn test_live_access_credential_accepted() {
        let (pipeline, issuer, _) = setup().await;

        let issued = issuer
            .issue(PrincipalPayload::new("u1").with_name("Ada"), TokenType::Access, false, "user")
            .await
            .unwrap();

        let principal = pipeline.authenticate(&issued.credential).await.unwrap();
        assert_eq!(principal.subject, "u1");
        assert_eq!(principal.identifier, issued.identifier);
        assert_eq!(principal.payload.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_refresh_credential_rejected() {
        let (pipeline, issuer, _) = setup().await;

        let issued = issuer
            .issue(PrincipalPayload::new("u1"), TokenType::Refresh, false, "user")
            .await
            .unwrap();

        let err = pipeline.authenticate(&issued.credential).await.unwrap_err();
        assert_eq!(err.reason(), RejectReason::WrongType);
    }

    #[tokio::test]
    async fn test_removed_identifier_rejected() {
        let (pipeline, issuer, ctx) = setup().await;

        let issued = issuer
            .issue(PrincipalPayload::new("u1"), TokenType::Access, false, "user")
            .await
            .unwrap();
        ctx.registry
            .remove(&keys::subject_list("u1"), &issued.identifier)
            .await
            .unwrap();

        let err = pipeline.authenticate(&issued.credential).await.unwrap_err();
        assert_eq!(err.reason(), RejectReason::Revoked);
    }

    #[tokio::test]
    async fn test_verification_refreshes_liveness() {
        let config = SessionConfig {
            access_ttl: "3s".to_string(),
            ..Default::default()
        };
        let ctx = SessionContext::ephemeral(&config).await.unwrap();
        let pipeline = VerificationPipeline::new(ctx.clone());
        let issuer = TokenIssuer::new(ctx.clone());

        let issued = issuer
            .issue(PrincipalPayload::new("u1"), TokenType::Access, false, "user")
            .await
            .unwrap();
        let before = crate::sessions::list_sessions(&ctx, "u1").await.unwrap()[0].last_accessed_at;

        // Timestamps have second resolution.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        pipeline.authenticate(&issued.credential).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let after = crate::sessions::list_sessions(&ctx, "u1").await.unwrap()[0].last_accessed_at;
        assert!(after > before);

        // Past the original three-second lifetime the touched key is still there.
        tokio::time::sleep(Duration::from_millis(2000)).await;
        let liveness = ctx.registry.get(&keys::liveness(&issued.identifier)).await.unwrap();
        assert_eq!(liveness, Some(after.timestamp().to_string()));
    }

    #[tokio::test]
    async fn test_foreign_identifier_rejected() {
        let (pipeline, _, _) = setup().await;

        let err = pipeline
            .verify(&VerifiedCredential {
                identifier: "00ff00ff".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.reason(), RejectReason::Undecodable);

        let err = pipeline.authenticate("not-a-credential").await.unwrap_err();
        assert_eq!(err.reason(), RejectReason::Signature);
    }
}
