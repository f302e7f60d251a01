//! Staging of uploaded videos on local disk.
//!
//! Each upload gets a unique file name inside the upload directory and is
//! removed when its [`StagedUpload`] is dropped, whichever way the request
//! ends.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Longest client file name kept in the staged name.
const MAX_NAME_LEN: usize = 100;

/// An uploaded file on disk, deleted on drop.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    /// Unique id shared by the staged file and any annotation output.
    pub id: String,
    pub original_name: String,
    pub size: u64,
}

impl StagedUpload {
    /// Stream a multipart field into `<dir>/<uuid>_<sanitized name>`.
    pub async fn from_field(dir: &Path, original_name: &str, mut field: Field<'_>) -> AppResult<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::InternalError(format!("cannot create upload dir: {e}")))?;

        let id = Uuid::new_v4().to_string();
        let path = dir.join(format!("{id}_{}", sanitize_filename(original_name)));

        let mut staged = StagedUpload {
            path,
            id,
            original_name: original_name.to_string(),
            size: 0,
        };

        // The guard exists before the file does, so a failed write still cleans up.
        let mut file = tokio::fs::File::create(&staged.path)
            .await
            .map_err(|e| AppError::InternalError(format!("cannot create upload file: {e}")))?;

        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::InternalError(format!("cannot write upload: {e}")))?;
            staged.size += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| AppError::InternalError(format!("cannot write upload: {e}")))?;

        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload")
            }
        }
    }
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]` becomes
/// `_`. Names that end up empty or dot-only become `upload`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
