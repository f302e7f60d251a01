//! Route definitions for `/detect`.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::detect;
use crate::state::AppState;

/// Routes mounted at `/detect`. Uploads may be up to `body_limit` bytes.
///
/// ```text
/// POST /    -> detect (multipart `file`)
/// ```
pub fn router(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(detect::detect))
        .layer(DefaultBodyLimit::max(body_limit))
}
