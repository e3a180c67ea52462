//! Mapping of engine and store failures onto HTTP responses.

use crate::users::UserError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tollgate_session::{Rejected, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid email or password")]
    BadLogin,

    #[error(transparent)]
    Rejected(#[from] Rejected),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Session(e) => match e {
                SessionError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
                SessionError::InvalidCredential(_) | SessionError::Decode => StatusCode::UNAUTHORIZED,
                e if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::User(UserError::EmailTaken) => StatusCode::CONFLICT,
            ApiError::User(UserError::Database(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::User(UserError::Hash(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BadLogin | ApiError::Rejected(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        // Server-side detail stays in the log.
        let message = if status.is_server_error() {
            status.canonical_reason().unwrap_or("internal error").to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_session::RejectReason;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(SessionError::InvalidParameter("role".into())), StatusCode::BAD_REQUEST),
            (ApiError::from(SessionError::InvalidCredential("spent".into())), StatusCode::UNAUTHORIZED),
            (ApiError::from(SessionError::Decode), StatusCode::UNAUTHORIZED),
            (
                ApiError::from(SessionError::RegistryUnavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::from(SessionError::StoreUnavailable(sqlx::Error::PoolTimedOut)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ApiError::from(UserError::EmailTaken), StatusCode::CONFLICT),
            (ApiError::from(Rejected::new(RejectReason::Revoked)), StatusCode::UNAUTHORIZED),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error}");
        }
    }
}
