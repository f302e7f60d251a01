//! Handlers for the `/auth` resource (register, login, logout, me).

use armorsight_core::credentials::{
    validate_login, validate_registration, RegistrationInput, INVALID_CREDENTIALS, USER_EXISTS,
};
use armorsight_core::error::CoreError;
use armorsight_db::models::session::CreateSession;
use armorsight_db::models::user::{CreateUser, UserProfile};
use armorsight_db::repositories::{SessionRepo, UserRepo};
use axum::extract::State;
use axum::http::{header::USER_AGENT, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, verify_password_or_dummy};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
///
/// Missing fields deserialize as empty so they are reported as validation
/// errors rather than body-parse failures.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    #[serde(alias = "username")]
    pub userid: String,
    pub password: String,
    pub confirm_password: Option<String>,
    pub name: String,
    pub unit: String,
    pub tank: String,
    pub rank: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub userid: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub usercode: String,
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserProfile,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account. Returns 201, or 409 when the usercode is taken.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<RegisterResponse>>)> {
    let registration = validate_registration(&RegistrationInput {
        usercode: &input.userid,
        password: &input.password,
        confirm_password: input.confirm_password.as_deref(),
        user_name: &input.name,
        affiliation_id: &input.unit,
        field: &input.rank,
        tank_id: &input.tank,
    })?;

    let password_hash = hash_password(&registration.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let created = UserRepo::create(
        &state.pool,
        &CreateUser {
            usercode: registration.usercode,
            user_name: registration.user_name,
            affiliation_id: registration.affiliation_id,
            field: registration.field,
            tank_id: registration.tank_id,
            password_hash,
        },
    )
    .await?
    .ok_or_else(|| AppError::Core(CoreError::Conflict(USER_EXISTS.into())))?;

    tracing::info!(user_id = created.id, usercode = %created.usercode, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: RegisterResponse {
                usercode: created.usercode,
            },
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with usercode + password. Unknown usercodes and wrong
/// passwords get the same 401 so the response does not reveal which
/// usercodes exist.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<LoginResponse>>> {
    let usercode = validate_login(&input.userid, &input.password)?;
    let rejected = || AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into()));

    let user = UserRepo::find_by_usercode(&state.pool, usercode).await?;

    let password_valid = verify_password_or_dummy(
        &input.password,
        user.as_ref().map(|u| u.password_hash.as_str()),
    )
    .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    let user = match user {
        Some(user) if password_valid => user,
        _ => {
            tracing::info!(usercode, "Login rejected");
            return Err(rejected());
        }
    };

    let issued = generate_access_token(&user.usercode, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            token_hash: issued.session_hash,
            expires_at: issued.expires_at,
            user_agent,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, usercode = %user.usercode, "User logged in");

    Ok(Json(DataResponse {
        data: LoginResponse {
            access_token: issued.token,
            expires_in: state.config.jwt.expires_in_secs(),
            user: UserProfile::from(user),
        },
    }))
}

/// POST /api/v1/auth/logout
///
/// End the caller's current session. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    SessionRepo::revoke_by_token_hash(&state.pool, &auth_user.session_hash).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout/all
///
/// End every session the caller has open. Returns 204 No Content.
pub async fn logout_all(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    tracing::info!(user_id = auth_user.user_id, revoked, "Revoked all sessions");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserProfile>>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "User",
                key: auth_user.usercode.clone(),
            })
        })?;
    Ok(Json(DataResponse {
        data: UserProfile::from(user),
    }))
}
