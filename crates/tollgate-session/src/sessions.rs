//! Active-session enumeration.

use crate::context::SessionContext;
use crate::error::SessionError;
use crate::registry::keys;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use tollgate_core::PrincipalPayload;

/// One live session of a subject, as shown to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub device: Option<String>,
    pub origin: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub last_accessed_at: DateTime<Utc>,
    pub identifier: String,
}

/// List a subject's live sessions, most recent first.
///
/// Identifiers whose liveness key has expired belong to lapsed credentials and are
/// left out.
pub async fn list_sessions(ctx: &SessionContext, subject: &str) -> Result<Vec<ActiveSession>, SessionError> {
    let sessions = with_last_seen(ctx, subject)
        .await?
        .into_iter()
        .filter_map(|(identifier, seen)| {
            let last_accessed_at = seen.and_then(parse_timestamp)?;
            let payload: PrincipalPayload = match ctx.codec.decode(&identifier) {
                Ok(payload) => payload,
                Err(_) => {
                    tracing::warn!(subject = %subject, "Skipping undecodable session identifier");
                    return None;
                }
            };
            Some(ActiveSession {
                issued_at: payload.issued_at(),
                device: payload.device,
                origin: payload.origin,
                last_accessed_at,
                identifier,
            })
        })
        .collect();

    Ok(sessions)
}

/// Drop listed identifiers whose liveness key has expired. Returns how many went.
///
/// A liveness key lives at least as long as its credential, so a missing one means
/// the credential can no longer authenticate.
pub async fn prune_lapsed(ctx: &SessionContext, subject: &str) -> Result<usize, SessionError> {
    let list_key = keys::subject_list(subject);
    let lapsed: Vec<String> = with_last_seen(ctx, subject)
        .await?
        .into_iter()
        .filter(|(_, seen)| seen.is_none())
        .map(|(identifier, _)| identifier)
        .collect();

    let registry = &ctx.registry;
    let removed = try_join_all(lapsed.iter().map(|id| registry.remove(&list_key, id))).await?;
    let count = removed.into_iter().filter(|r| *r).count();
    if count > 0 {
        tracing::debug!(subject = %subject, count, "Pruned lapsed sessions");
    }
    Ok(count)
}

/// Listed identifiers paired with their raw liveness value.
async fn with_last_seen(ctx: &SessionContext, subject: &str) -> Result<Vec<(String, Option<String>)>, SessionError> {
    let live = ctx.registry.range(&keys::subject_list(subject)).await?;

    let registry = &ctx.registry;
    let last_seen = try_join_all(live.iter().map(|id| {
        let key = keys::liveness(id);
        async move { registry.get(&key).await }
    }))
    .await?;

    Ok(live.into_iter().zip(last_seen).collect())
}

fn parse_timestamp(value: String) -> Option<DateTime<Utc>> {
    let secs = value.parse::<i64>().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}
