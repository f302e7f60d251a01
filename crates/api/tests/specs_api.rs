//! HTTP-level tests for spec lookup.

mod common;

use axum::http::StatusCode;
use common::{body_json, get};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_spec_lookup_returns_typed_row(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/specs/K2").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["Name"], "K2");
    assert_eq!(json["data"]["Country"], "South Korea");
    assert_eq!(json["data"]["Weight_t"], 55);
    assert_eq!(json["data"]["Crew"], 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_spec_lookup_is_case_sensitive(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/specs/t-90").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "not found");
    assert_eq!(json["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_spec_lookup_decodes_path(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/specs/T-90").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["Weight_t"], 46.5);
}
