use crate::state::AppState;
use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Axum middleware admitting only requests that carry a live access credential.
///
/// On success the authenticated [`Principal`](tollgate_session::Principal) is
/// inserted into the request extensions.
pub async fn require_session(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .cloned()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let bearer = extract_bearer(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let principal = state
        .sessions
        .authenticate(&bearer)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let rest = value.strip_prefix("Bearer ")?.trim();
    if rest.is_empty() {
        return None;
    }
    Some(rest.to_string())
}
