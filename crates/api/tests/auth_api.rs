//! HTTP-level integration tests for registration, login, logout and profile.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, login_token, post_auth, post_json, register};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_register_creates_user(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = register(app, "21-7001", "pw-1234").await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["usercode"], "21-7001");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_register_accepts_username_alias_and_trims(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({ "username": "  alias-1 ", "password": "pw", "name": " Choi " }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["usercode"], "alias-1");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_register_missing_fields_is_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({ "userid": "   ", "password": "pw" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("usercode"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_register_password_mismatch_is_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({
            "userid": "mismatch",
            "password": "one",
            "confirm_password": "two",
            "name": "Kang",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_registration_is_rejected_and_first_still_logs_in(pool: PgPool) {
    let app = common::build_test_app(pool);

    let first = register(app.clone(), "dup-01", "first-pw").await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = register(app.clone(), "dup-01", "second-pw").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error"], "user exists");

    let login = post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "userid": "dup-01", "password": "first-pw" }),
    )
    .await;
    assert_eq!(login.status(), StatusCode::OK);

    let hijack = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "userid": "dup-01", "password": "second-pw" }),
    )
    .await;
    assert_eq!(hijack.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_success_returns_token_and_profile(pool: PgPool) {
    let app = common::build_test_app(pool);
    register(app.clone(), "login-1", "secret").await;

    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "username": "login-1", "password": "secret" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["access_token"].is_string());
    assert_eq!(json["data"]["expires_in"], 8 * 3600);
    assert_eq!(json["data"]["user"]["usercode"], "login-1");
    assert_eq!(json["data"]["user"]["unit"], "7th Armored");
    assert!(json["data"]["user"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_wrong_password_and_unknown_user_are_indistinguishable(pool: PgPool) {
    let app = common::build_test_app(pool);
    register(app.clone(), "known", "right").await;

    let wrong_password = post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "userid": "known", "password": "wrong" }),
    )
    .await;
    let unknown_user = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "userid": "nobody", "password": "right" }),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_user).await);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_missing_fields_is_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "userid": "someone" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_me_requires_token(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_me_returns_profile(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = login_token(app.clone(), "me-1", "pw").await;

    let response = get_auth(app, "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["usercode"], "me-1");
    assert_eq!(json["data"]["rank"], "Sergeant");
    assert_eq!(json["data"]["tank"], "K2-101");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_logout_revokes_only_that_session(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token_a = login_token(app.clone(), "multi", "pw").await;
    let login_b = post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "userid": "multi", "password": "pw" }),
    )
    .await;
    let token_b = body_json(login_b).await["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let logout = post_auth(app.clone(), "/api/v1/auth/logout", &token_a).await;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    let after_a = get_auth(app.clone(), "/api/v1/auth/me", &token_a).await;
    assert_eq!(after_a.status(), StatusCode::UNAUTHORIZED);

    let after_b = get_auth(app, "/api/v1/auth/me", &token_b).await;
    assert_eq!(after_b.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_logout_all_revokes_every_session(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token_a = login_token(app.clone(), "everywhere", "pw").await;
    let login_b = post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "userid": "everywhere", "password": "pw" }),
    )
    .await;
    let token_b = body_json(login_b).await["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let logout = post_auth(app.clone(), "/api/v1/auth/logout/all", &token_a).await;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    for token in [&token_a, &token_b] {
        let response = get_auth(app.clone(), "/api/v1/auth/me", token).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_garbage_token_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/auth/me", "not.a.jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}
