use armorsight_core::error::CoreError;
use armorsight_vision::VisionError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `armorsight_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A failure inside the detection pipeline.
    #[error(transparent)]
    Vision(#[from] VisionError),

    /// A malformed or oversized multipart upload.
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, key } => {
                    tracing::debug!(entity, key = %key, "Lookup miss");
                    (StatusCode::NOT_FOUND, "NOT_FOUND", "not found".to_string())
                }
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Detection pipeline ---
            AppError::Vision(err) => classify_vision_error(err),

            // --- HTTP-specific errors ---
            AppError::Multipart(err) => classify_multipart_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Keep the status the multipart parser chose, e.g. 413 for an upload over
/// the body limit.
fn classify_multipart_error(err: &MultipartError) -> (StatusCode, &'static str, String) {
    let status = err.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "PAYLOAD_TOO_LARGE"
    } else {
        "BAD_REQUEST"
    };
    (status, code, err.body_text())
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", "not found".to_string()),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

/// Unreadable uploads are the client's fault (400); a blown time budget is
/// 504; anything else is an inference failure (500).
fn classify_vision_error(err: &VisionError) -> (StatusCode, &'static str, String) {
    if err.is_input_error() {
        tracing::info!(error = %err, "Rejected undecodable upload");
        return (
            StatusCode::BAD_REQUEST,
            "INVALID_VIDEO",
            "could not decode video".to_string(),
        );
    }
    match err {
        VisionError::Timeout(secs) => {
            tracing::warn!(timeout_secs = secs, "Detection timed out");
            (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                "detection timed out".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Detection failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INFERENCE_ERROR",
                "inference error".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armorsight_vision::ffmpeg::FfmpegError;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn core_errors_map_to_http_statuses() {
        let not_found = AppError::Core(CoreError::NotFound {
            entity: "Spec",
            key: "T-90".into(),
        });
        assert_eq!(status_of(not_found), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AppError::Core(CoreError::Conflict("user exists".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::Validation("x".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::Unauthorized("x".into()))),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn vision_errors_split_input_from_infrastructure() {
        let bad_video = VisionError::Ffmpeg(FfmpegError::InvalidVideo("no stream".into()));
        assert_eq!(status_of(bad_video.into()), StatusCode::BAD_REQUEST);

        assert_eq!(
            status_of(VisionError::Timeout(240).into()),
            StatusCode::GATEWAY_TIMEOUT
        );

        let no_binary = VisionError::Ffmpeg(FfmpegError::NotFound(std::io::Error::from(
            std::io::ErrorKind::NotFound,
        )));
        assert_eq!(status_of(no_binary.into()), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_errors_are_sanitized() {
        let response = AppError::InternalError("secret path /etc/x".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
