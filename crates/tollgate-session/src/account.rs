//! Redemption of single-use account tokens (email verification, password reset).

use crate::context::SessionContext;
use crate::error::SessionError;
use crate::registry::keys;
use tollgate_core::{PrincipalPayload, TokenType};

/// Redeem a single-use credential and return its payload.
///
/// Only the most recently issued token of a type redeems, and only once: the
/// pending slot is cleared with compare-and-delete, so a superseded token leaves
/// the newer one in place.
pub async fn redeem(
    ctx: &SessionContext,
    credential: &str,
    token_type: TokenType,
) -> Result<PrincipalPayload, SessionError> {
    if !token_type.is_single_use() {
        return Err(SessionError::InvalidParameter(format!(
            "{token_type} credentials are not redeemable"
        )));
    }

    let verified = ctx
        .verifier
        .verify(credential)
        .map_err(|e| SessionError::InvalidCredential(e.to_string()))?;
    let payload: PrincipalPayload = ctx.codec.decode(&verified.identifier)?;

    if payload.token_type != Some(token_type) {
        return Err(SessionError::InvalidCredential(format!("not a {token_type} credential")));
    }

    let redeemed = ctx
        .registry
        .delete_if_eq(&keys::pending(token_type, &payload.sub), &verified.identifier)
        .await?;
    if !redeemed {
        tracing::warn!(subject = %payload.sub, token_type = %token_type, "Spent or superseded account token");
        return Err(SessionError::InvalidCredential(format!(
            "{token_type} credential already used or superseded"
        )));
    }

    tracing::info!(subject = %payload.sub, token_type = %token_type, "Account token redeemed");
    Ok(payload)
}
