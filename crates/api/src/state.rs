use std::sync::Arc;

use armorsight_core::spec_table::SpecTable;
use armorsight_vision::DetectionPipeline;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything heavy is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: armorsight_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Detection pipeline wrapping the process-wide detector.
    pub pipeline: Arc<DetectionPipeline>,
    /// Vehicle spec table, loaded once at startup.
    pub spec_table: Arc<SpecTable>,
}
