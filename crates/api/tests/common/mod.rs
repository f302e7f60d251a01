#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use armorsight_api::auth::jwt::JwtConfig;
use armorsight_api::config::{DetectConfig, ServerConfig};
use armorsight_api::router::build_app_router;
use armorsight_api::state::AppState;
use armorsight_core::detection::{BoundingBox, Detection};
use armorsight_core::detector::{DetectError, Detector};
use armorsight_core::frame::RgbFrame;
use armorsight_core::spec_table::SpecTable;
use armorsight_vision::ffmpeg::FfmpegError;
use armorsight_vision::source::{FrameSource, SourceOpener};
use armorsight_vision::DetectionPipeline;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub const SPEC_CSV: &str = " Name ,Country,Weight_t,Crew\n\
                            T-90,Russia,46.5,3\n\
                            K2,South Korea,55,3\n";

/// Detector that never finds anything. HTTP tests never reach real frames.
pub struct NullDetector;

impl Detector for NullDetector {
    fn detect(&self, _frame: &RgbFrame) -> Result<Vec<Detection>, DetectError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Reports one detection of `label` on every frame, or nothing when `label` is `None`.
pub struct FixedDetector {
    pub label: Option<&'static str>,
    pub confidence: f32,
}

impl Detector for FixedDetector {
    fn detect(&self, _frame: &RgbFrame) -> Result<Vec<Detection>, DetectError> {
        let Some(label) = self.label else {
            return Ok(Vec::new());
        };
        let bbox = BoundingBox::new(2, 2, 10, 10).expect("valid box");
        Ok(Detection::new(label, self.confidence, bbox).into_iter().collect())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Yields `frames` blank frames for any uploaded file, without ffmpeg.
pub struct BlankFrames {
    remaining: u64,
    next_index: u64,
}

#[async_trait]
impl FrameSource for BlankFrames {
    async fn next_frame(&mut self) -> Result<Option<RgbFrame>, FfmpegError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let index = self.next_index;
        self.next_index += 1;
        Ok(RgbFrame::new(index, 16, 16, vec![0; 16 * 16 * 3]))
    }
}

pub struct BlankFramesOpener(pub u64);

#[async_trait]
impl SourceOpener for BlankFramesOpener {
    async fn open(
        &self,
        _path: &Path,
        _max_frames: Option<u64>,
    ) -> Result<Box<dyn FrameSource>, FfmpegError> {
        Ok(Box::new(BlankFrames {
            remaining: self.0,
            next_index: 0,
        }))
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            session_expiry_hours: 8,
        },
        detect: DetectConfig {
            upload_dir: std::env::temp_dir().join("armorsight-test-uploads"),
            max_upload_bytes: 1024 * 1024,
            model_path: PathBuf::from("unused.onnx"),
            labels_path: None,
            conf_threshold: 0.3,
            iou_threshold: 0.45,
            input_size: 640,
            max_frames: None,
            timeout_secs: 10,
            annotate_dir: None,
            require_auth: true,
        },
        spec_table_path: PathBuf::from("unused.csv"),
        app_dist_dir: None,
    }
}

/// Build the full application router (same middleware stack as production).
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let pipeline = DetectionPipeline::new(
        Arc::new(NullDetector),
        armorsight_vision::PipelineOptions {
            timeout: Duration::from_secs(config.detect.timeout_secs),
            ..Default::default()
        },
    );
    build_app_with_pipeline(pool, config, pipeline)
}

/// App whose `/detect` runs `detector` over `frames` blank frames per upload.
pub fn build_detect_app(
    pool: PgPool,
    config: ServerConfig,
    detector: impl Detector + 'static,
    frames: u64,
) -> Router {
    let pipeline = DetectionPipeline::new(Arc::new(detector), config.detect.pipeline_options())
        .with_opener(Arc::new(BlankFramesOpener(frames)));
    build_app_with_pipeline(pool, config, pipeline)
}

fn build_app_with_pipeline(
    pool: PgPool,
    config: ServerConfig,
    pipeline: DetectionPipeline,
) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        pipeline: Arc::new(pipeline),
        spec_table: Arc::new(SpecTable::from_csv(SPEC_CSV.as_bytes()).unwrap()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub const BOUNDARY: &str = "armorsight-test-boundary";

/// Encode `(field name, optional file name, bytes)` parts as multipart/form-data.
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(f) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                     Content-Type: video/mp4\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: Vec<u8>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, builder.body(Body::from(body)).unwrap()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Account helpers
// ---------------------------------------------------------------------------

pub async fn register(app: Router, usercode: &str, password: &str) -> Response<Body> {
    post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({
            "userid": usercode,
            "password": password,
            "confirm_password": password,
            "name": "Lee",
            "unit": "7th Armored",
            "tank": "K2-101",
            "rank": "Sergeant",
        }),
    )
    .await
}

/// Register and log in, returning the access token.
pub async fn login_token(app: Router, usercode: &str, password: &str) -> String {
    register(app.clone(), usercode, password).await;
    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "userid": usercode, "password": password }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    body_json(response).await["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}
