//! Route definitions for `/specs`.

use axum::routing::get;
use axum::Router;

use crate::handlers::specs;
use crate::state::AppState;

/// ```text
/// GET /{name}    -> get_spec
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{name}", get(specs::get_spec))
}
