//! Vehicle spec lookup.

use armorsight_core::error::CoreError;
use armorsight_core::spec_table::SpecRow;
use axum::extract::{Path, State};
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/specs/{name}
///
/// Exact, case-sensitive match on the table's `Name` column.
pub async fn get_spec(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<DataResponse<SpecRow>>> {
    let row = state.spec_table.lookup(&name).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Spec",
            key: name.clone(),
        })
    })?;
    Ok(Json(DataResponse { data: row.clone() }))
}
