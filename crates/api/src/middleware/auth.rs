//! Session-checked JWT authentication extractors for Axum handlers.

use armorsight_core::error::CoreError;
use armorsight_core::types::DbId;
use armorsight_db::repositories::SessionRepo;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::jwt::{hash_session_id, validate_token};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// The token must be correctly signed, unexpired, and belong to a session
/// that has not been revoked.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from the session row).
    pub user_id: DbId,
    /// The user's usercode (from `claims.sub`).
    pub usercode: String,
    /// Hash identifying the session, used by logout.
    pub session_hash: String,
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Invalid Authorization format. Expected: Bearer <token>"))?;

        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        let session_hash = hash_session_id(&claims.jti);
        let session = SessionRepo::find_active_by_token_hash(&state.pool, &session_hash)
            .await?
            .ok_or_else(|| unauthorized("Session has ended"))?;

        Ok(AuthUser {
            user_id: session.user_id,
            usercode: claims.sub,
            session_hash,
        })
    }
}

/// Caller of the detection endpoint.
///
/// With `DETECT_REQUIRE_AUTH=true` this rejects exactly like [`AuthUser`].
/// Otherwise a request without an `Authorization` header is accepted
/// anonymously, while a header that is present must still be valid.
#[derive(Debug, Clone)]
pub struct DetectCaller(pub Option<AuthUser>);

impl FromRequestParts<AppState> for DetectCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.config.detect.require_auth && !parts.headers.contains_key("authorization") {
            return Ok(DetectCaller(None));
        }
        AuthUser::from_request_parts(parts, state)
            .await
            .map(|user| DetectCaller(Some(user)))
    }
}
