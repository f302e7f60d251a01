//! Video upload → detection summary → spec lookup.

use armorsight_core::spec_table::SpecRow;
use armorsight_core::summary::Summary;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::DetectCaller;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::upload::StagedUpload;

/// Detection result for one uploaded video.
///
/// The summary fields sit at the top level next to `spec`, e.g.
/// `{"status":"Detected","top_label":"K2",...,"spec":{...}}`.
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    #[serde(flatten)]
    pub summary: Summary,
    /// Spec row for the top label, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<SpecRow>,
}

/// POST /api/v1/detect
///
/// Accepts a multipart form with a required `file` field holding a video.
pub async fn detect(
    State(state): State<AppState>,
    DetectCaller(caller): DetectCaller,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<DetectResponse>>> {
    let mut upload: Option<StagedUpload> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue; // ignore unknown fields
        }
        let filename = field.file_name().unwrap_or("").trim().to_string();
        if filename.is_empty() {
            return Err(AppError::BadRequest("empty filename".into()));
        }
        upload = Some(
            StagedUpload::from_field(&state.config.detect.upload_dir, &filename, field).await?,
        );
        break;
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("file required".into()))?;
    if upload.size == 0 {
        return Err(AppError::BadRequest("empty file".into()));
    }

    tracing::info!(
        upload_id = %upload.id,
        file = %upload.original_name,
        bytes = upload.size,
        usercode = caller.as_ref().map(|c| c.usercode.as_str()),
        "Running detection"
    );

    let outcome = state.pipeline.run_file(upload.path(), &upload.id).await?;

    let spec = outcome
        .summary
        .top_label()
        .and_then(|label| state.spec_table.lookup(label))
        .cloned();

    tracing::info!(
        upload_id = %upload.id,
        status = outcome.summary.status(),
        top_label = outcome.summary.top_label(),
        frames_processed = outcome.frames_processed,
        spec_found = spec.is_some(),
        "Detection finished"
    );

    Ok(Json(DataResponse {
        data: DetectResponse {
            summary: outcome.summary,
            spec,
        },
    }))
}
