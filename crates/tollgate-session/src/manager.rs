//! Session manager: the one entry point the serving layer talks to.

use crate::account;
use crate::context::SessionContext;
use crate::error::{Rejected, SessionError};
use crate::issuer::{IssuedCredential, TokenIssuer, TokenPair};
use crate::registry::SessionRegistry;
use crate::revoke::RevocationEngine;
use crate::sessions::{self, ActiveSession};
use crate::store::SessionStore;
use crate::verify::{Principal, VerificationPipeline};
use std::sync::Arc;
use tollgate_core::{CryptoConfig, KeyConfig, PrincipalPayload, SessionConfig, TokenType};
use tollgate_token::{KeyPair, PayloadCodec, VerifiedCredential};

/// Wires the issuer, verification pipeline and revocation engine over one context.
#[derive(Clone)]
pub struct SessionManager {
    ctx: SessionContext,
    default_role: Arc<str>,
    issuer: Arc<TokenIssuer>,
    pipeline: VerificationPipeline,
    revocation: Arc<RevocationEngine>,
}

impl SessionManager {
    pub fn new(ctx: SessionContext, default_role: impl Into<String>) -> Self {
        let issuer = Arc::new(TokenIssuer::new(ctx.clone()));
        let revocation = Arc::new(RevocationEngine::new(ctx.clone(), issuer.clone()));
        Self {
            pipeline: VerificationPipeline::new(ctx.clone()),
            default_role: default_role.into().into(),
            issuer,
            revocation,
            ctx,
        }
    }

    /// Resolve the payload key and signing keys, then build every component.
    pub fn from_config(
        session: &SessionConfig,
        crypto: &CryptoConfig,
        keys: &KeyConfig,
        registry: Arc<dyn SessionRegistry>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, SessionError> {
        let codec = PayloadCodec::from_config(crypto)?;
        let (keypair, public_key) = KeyPair::from_config(keys)?;

        let ctx = SessionContext::new(
            codec,
            keypair,
            public_key,
            registry,
            store,
            session.lifetimes()?,
            session.roles.clone(),
        );
        Ok(Self::new(ctx, session.default_role.clone()))
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    /// Open a session. `role` falls back to the configured default role.
    pub async fn login(
        &self,
        payload: PrincipalPayload,
        remember_me: bool,
        role: Option<&str>,
    ) -> Result<TokenPair, SessionError> {
        let role = role.unwrap_or(&*self.default_role);
        self.issuer.open_session(payload, remember_me, role).await
    }

    pub async fn issue(
        &self,
        payload: PrincipalPayload,
        token_type: TokenType,
        remember_me: bool,
        role: &str,
    ) -> Result<IssuedCredential, SessionError> {
        self.issuer.issue(payload, token_type, remember_me, role).await
    }

    /// Issue an email-verification or password-reset credential with the default role.
    pub async fn issue_account_token(
        &self,
        payload: PrincipalPayload,
        token_type: TokenType,
    ) -> Result<IssuedCredential, SessionError> {
        if !token_type.is_single_use() {
            return Err(SessionError::InvalidParameter(format!(
                "{token_type} is not an account token type"
            )));
        }
        self.issuer.issue(payload, token_type, false, &self.default_role).await
    }

    pub async fn redeem_account_token(
        &self,
        credential: &str,
        token_type: TokenType,
    ) -> Result<PrincipalPayload, SessionError> {
        account::redeem(&self.ctx, credential, token_type).await
    }

    pub async fn authenticate(&self, bearer: &str) -> Result<Principal, Rejected> {
        self.pipeline.authenticate(bearer).await
    }

    pub async fn verify(&self, credential: &VerifiedCredential) -> Result<Principal, Rejected> {
        self.pipeline.verify(credential).await
    }

    pub async fn refresh(&self, access_credential: &str, refresh_credential: &str) -> Result<TokenPair, SessionError> {
        self.revocation.rotate(access_credential, refresh_credential).await
    }

    /// End the session the principal authenticated with.
    pub async fn logout(&self, principal: &Principal) -> Result<bool, SessionError> {
        self.revocation
            .logout_one(&principal.subject, &principal.identifier)
            .await
    }

    pub async fn logout_session(&self, subject: &str, identifier: &str) -> Result<bool, SessionError> {
        self.revocation.logout_one(subject, identifier).await
    }

    pub async fn logout_all(&self, subject: &str) -> Result<usize, SessionError> {
        self.revocation.logout_all(subject).await
    }

    pub async fn logout_all_except(&self, subject: &str, keep: &str) -> Result<usize, SessionError> {
        self.revocation.logout_all_except(subject, keep).await
    }

    pub async fn list_sessions(&self, subject: &str) -> Result<Vec<ActiveSession>, SessionError> {
        sessions::list_sessions(&self.ctx, subject).await
    }
}
