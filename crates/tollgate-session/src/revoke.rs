//! Logout and credential rotation.
//!
//! Every operation writes to the registry and the durable store concurrently with no
//! shared transaction. Either side failing fails the operation; the registry stays
//! authoritative for verification, so a partial write never leaves a revoked
//! credential usable.

use crate::context::SessionContext;
use crate::error::SessionError;
use crate::issuer::{TokenIssuer, TokenPair};
use crate::registry::keys;
use crate::store::RecordMatcher;
use futures::future::try_join_all;
use std::sync::Arc;
use tollgate_core::{PrincipalPayload, TokenType};

pub struct RevocationEngine {
    ctx: SessionContext,
    issuer: Arc<TokenIssuer>,
}

impl RevocationEngine {
    pub fn new(ctx: SessionContext, issuer: Arc<TokenIssuer>) -> Self {
        Self { ctx, issuer }
    }

    /// Revoke one session. Returns `false` if it was not live.
    pub async fn logout_one(&self, subject: &str, identifier: &str) -> Result<bool, SessionError> {
        let list_key = keys::subject_list(subject);
        if !self.ctx.registry.contains(&list_key, identifier).await? {
            return Ok(false);
        }

        self.revoke(&list_key, identifier).await?;
        tracing::info!(subject = %subject, "Session revoked");
        Ok(true)
    }

    /// Revoke every session of a subject. Returns how many were live.
    pub async fn logout_all(&self, subject: &str) -> Result<usize, SessionError> {
        let list_key = keys::subject_list(subject);
        let live = self.ctx.registry.range(&list_key).await?;

        let registry = &self.ctx.registry;
        tokio::try_join!(
            try_join_all(live.iter().map(|id| {
                let key = keys::liveness(id);
                async move { registry.delete(&key).await }
            })),
            registry.delete(&list_key),
            self.ctx.store.delete_all_records(subject),
        )?;

        tracing::info!(subject = %subject, count = live.len(), "All sessions revoked");
        Ok(live.len())
    }

    /// Revoke every session of a subject except `keep`. Returns how many listed
    /// sessions were revoked.
    ///
    /// Durable records of other sessions are dropped too, including ones whose
    /// identifiers are no longer listed, so their refresh credentials cannot rotate.
    pub async fn logout_all_except(&self, subject: &str, keep: &str) -> Result<usize, SessionError> {
        let list_key = keys::subject_list(subject);
        let others: Vec<String> = self
            .ctx
            .registry
            .range(&list_key)
            .await?
            .into_iter()
            .filter(|id| id != keep)
            .collect();

        let (revoked, dropped) = tokio::try_join!(
            try_join_all(others.iter().map(|id| self.logout_one(subject, id))),
            self.ctx.store.delete_all_except(subject, keep),
        )?;
        let count = revoked.into_iter().filter(|r| *r).count();

        tracing::info!(subject = %subject, count, records = dropped, "Other sessions revoked");
        Ok(count)
    }

    /// Exchange an access/refresh pair for a fresh one. Each pair rotates once.
    ///
    /// The access credential is read without expiry checking since it has normally
    /// lapsed by the time a client rotates. Deleting the durable record is the claim:
    /// of two concurrent rotations of one pair, only the one whose delete removed the
    /// row proceeds.
    pub async fn rotate(&self, access_credential: &str, refresh_credential: &str) -> Result<TokenPair, SessionError> {
        let refresh = self
            .ctx
            .verifier
            .verify(refresh_credential)
            .map_err(|e| invalid(format!("refresh credential rejected: {e}")))?;

        let record = self
            .ctx
            .store
            .find_by_access_credential(access_credential)
            .await?
            .ok_or_else(|| invalid("no session for access credential"))?;

        if record.refresh_credential != refresh_credential {
            tracing::warn!(subject = %record.subject, "Refresh credential does not match session record");
            return Err(invalid("refresh credential does not match session"));
        }

        let refresh_payload: PrincipalPayload = self.ctx.codec.decode(&refresh.identifier)?;
        if refresh_payload.token_type != Some(TokenType::Refresh) || refresh_payload.sub != record.subject {
            return Err(invalid("refresh credential does not belong to session"));
        }

        let access = self
            .ctx
            .verifier
            .inspect(access_credential)
            .map_err(|e| invalid(format!("access credential rejected: {e}")))?;
        let payload: PrincipalPayload = self.ctx.codec.decode(&access.identifier)?;
        if payload.sub != record.subject || access.identifier != record.identifier {
            return Err(invalid("access credential does not belong to session"));
        }

        let list_key = keys::subject_list(&record.subject);
        let liveness_key = keys::liveness(&record.identifier);
        let (claimed, _, _) = tokio::try_join!(
            self.ctx
                .store
                .delete_record(RecordMatcher::AccessCredential(&record.access_credential)),
            self.ctx.registry.remove(&list_key, &record.identifier),
            self.ctx.registry.delete(&liveness_key),
        )?;
        if !claimed {
            tracing::warn!(subject = %record.subject, "Session pair already rotated");
            return Err(invalid("session already rotated"));
        }

        let remember_me = payload.remember_me;
        let role = payload
            .role
            .clone()
            .ok_or_else(|| invalid("access credential carries no role"))?;

        let pair = self
            .issuer
            .open_session(payload.into_identity(), remember_me, &role)
            .await?;

        tracing::info!(subject = %record.subject, "Session rotated");
        Ok(pair)
    }

    async fn revoke(&self, list_key: &str, identifier: &str) -> Result<(), SessionError> {
        let liveness_key = keys::liveness(identifier);
        tokio::try_join!(
            self.ctx.registry.remove(list_key, identifier),
            self.ctx.registry.delete(&liveness_key),
            self.ctx.store.delete_record(RecordMatcher::Identifier(identifier)),
        )?;
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> SessionError {
    SessionError::InvalidCredential(reason.into())
}
