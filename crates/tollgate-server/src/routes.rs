use crate::{error::ApiError, middleware::auth::require_session, state::AppState};
use axum::{
    Extension, Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tollgate_core::PrincipalPayload;
use tollgate_session::{Principal, TokenPair};
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/logout-others", post(logout_others))
        .route("/auth/sessions", get(list_sessions))
        .route("/auth/sessions/{identifier}", delete(delete_session))
        .route_layer(middleware::from_fn(require_session));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .merge(protected)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": "tollgate" }))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::BadRequest("name and a valid email are required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters".to_string()));
    }

    let user = state
        .users
        .register(&req.name, &req.email, &req.password, state.sessions.default_role())
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
    #[serde(default)]
    remember_me: bool,
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let user = state
        .users
        .authenticate(&req.email, &req.password)
        .await?
        .ok_or(ApiError::BadLogin)?;

    let mut payload = PrincipalPayload::new(&user.id)
        .with_name(&user.name)
        .with_email(&user.email);
    payload.device = header_str(&headers, header::USER_AGENT.as_str());
    payload.origin = header_str(&headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()));

    let pair = state
        .sessions
        .login(payload, req.remember_me, Some(&user.role))
        .await?;
    Ok(Json(pair))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    access_token: String,
    refresh_token: String,
}

async fn refresh(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state
        .sessions
        .refresh(&req.access_token, &req.refresh_token)
        .await?;
    Ok(Json(pair))
}

async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let revoked = state.sessions.logout(&principal).await?;
    Ok(Json(json!({ "revoked": revoked })))
}

async fn logout_all(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let revoked = state.sessions.logout_all(&principal.subject).await?;
    Ok(Json(json!({ "revoked": revoked })))
}

async fn logout_others(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let revoked = state
        .sessions
        .logout_all_except(&principal.subject, &principal.identifier)
        .await?;
    Ok(Json(json!({ "revoked": revoked })))
}

async fn list_sessions(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sessions = state.sessions.list_sessions(&principal.subject).await?;
    Ok(Json(json!({
        "current": principal.identifier,
        "sessions": sessions,
    })))
}

async fn delete_session(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(identifier): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state
        .sessions
        .logout_session(&principal.subject, &identifier)
        .await?;

    let status = if revoked { StatusCode::OK } else { StatusCode::NOT_FOUND };
    Ok((status, Json(json!({ "revoked": revoked }))))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
