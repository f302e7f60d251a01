pub mod auth;
pub mod detect;
pub mod health;
pub mod specs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
/// /auth/logout                                     end current session (requires auth)
/// /auth/logout/all                                 end all sessions (requires auth)
/// /auth/me                                         current profile (requires auth)
///
/// /detect                                          video upload -> summary + spec
///
/// /specs/{name}                                    spec row by exact name
/// ```
pub fn api_routes(detect_body_limit: usize) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/detect", detect::router(detect_body_limit))
        .nest("/specs", specs::router())
}
