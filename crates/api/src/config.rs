use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use armorsight_vision::yolo::YoloParams;
use armorsight_vision::PipelineOptions;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. `DATABASE_URL` is read separately by the entrypoint.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300`). Must exceed the
    /// detection timeout so slow videos get a 504 from the pipeline rather
    /// than a bare 408 from the middleware.
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, session lifetime).
    pub jwt: JwtConfig,
    /// Upload, model and detection settings.
    pub detect: DetectConfig,
    /// CSV file with vehicle specs (default: `tank_concat.csv`).
    pub spec_table_path: PathBuf,
    /// Built SPA to serve under `/app`. Unset disables SPA serving.
    pub app_dist_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                        |
    /// |------------------------|------------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                      |
    /// | `PORT`                 | `5000`                                         |
    /// | `CORS_ORIGINS`         | `http://localhost:5173,http://127.0.0.1:5173`  |
    /// | `REQUEST_TIMEOUT_SECS` | `300`                                          |
    /// | `SPEC_TABLE_PATH`      | `tank_concat.csv`                              |
    /// | `APP_DIST_DIR`         | unset                                          |
    ///
    /// See [`JwtConfig::from_env`] and [`DetectConfig::from_env`] for the rest.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_parse("PORT", 5000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", 300);

        let spec_table_path = std::env::var("SPEC_TABLE_PATH")
            .unwrap_or_else(|_| "tank_concat.csv".into())
            .into();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            detect: DetectConfig::from_env(),
            spec_table_path,
            app_dist_dir: env_path("APP_DIST_DIR"),
        }
    }
}

/// Detection endpoint settings.
#[derive(Debug, Clone)]
pub struct DetectConfig {
    /// Where uploads are staged while they are processed.
    pub upload_dir: PathBuf,
    /// Request body cap for `/detect` uploads.
    pub max_upload_bytes: usize,
    pub model_path: PathBuf,
    /// One label per line. Falls back to `<model>.txt` when unset.
    pub labels_path: Option<PathBuf>,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub input_size: u32,
    pub max_frames: Option<u64>,
    pub timeout_secs: u64,
    pub annotate_dir: Option<PathBuf>,
    /// When false, `/detect` accepts anonymous uploads.
    pub require_auth: bool,
}

impl DetectConfig {
    /// | Env Var                 | Default            |
    /// |-------------------------|--------------------|
    /// | `UPLOAD_DIR`            | `uploads`          |
    /// | `MAX_UPLOAD_BYTES`      | `536870912`        |
    /// | `MODEL_PATH`            | `model/best.onnx`  |
    /// | `MODEL_LABELS_PATH`     | unset              |
    /// | `DETECT_CONF_THRESHOLD` | `0.3`              |
    /// | `DETECT_IOU_THRESHOLD`  | `0.45`             |
    /// | `DETECT_INPUT_SIZE`     | `640`              |
    /// | `DETECT_MAX_FRAMES`     | unset (all frames) |
    /// | `DETECT_TIMEOUT_SECS`   | `240`              |
    /// | `DETECT_ANNOTATE_DIR`   | unset (off)        |
    /// | `DETECT_REQUIRE_AUTH`   | `true`             |
    pub fn from_env() -> Self {
        let max_frames = std::env::var("DETECT_MAX_FRAMES").ok().map(|v| {
            v.parse::<u64>()
                .expect("DETECT_MAX_FRAMES must be a valid u64")
        });

        let conf_threshold: f32 = env_parse("DETECT_CONF_THRESHOLD", 0.3);
        assert!(
            (0.0..=1.0).contains(&conf_threshold),
            "DETECT_CONF_THRESHOLD must be within [0, 1]"
        );

        Self {
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".into())
                .into(),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", 512 * 1024 * 1024),
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| "model/best.onnx".into())
                .into(),
            labels_path: env_path("MODEL_LABELS_PATH"),
            conf_threshold,
            iou_threshold: env_parse("DETECT_IOU_THRESHOLD", 0.45),
            input_size: env_parse("DETECT_INPUT_SIZE", 640),
            max_frames,
            timeout_secs: env_parse("DETECT_TIMEOUT_SECS", 240),
            annotate_dir: env_path("DETECT_ANNOTATE_DIR"),
            require_auth: env_parse("DETECT_REQUIRE_AUTH", true),
        }
    }

    pub fn yolo_params(&self) -> YoloParams {
        YoloParams {
            input_size: self.input_size,
            conf_threshold: self.conf_threshold,
            iou_threshold: self.iou_threshold,
            ..YoloParams::default()
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_frames: self.max_frames,
            timeout: Duration::from_secs(self.timeout_secs),
            annotate_dir: self.annotate_dir.clone(),
        }
    }
}

/// Parse `key` or fall back to `default`. Panics on an unparseable value.
fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

/// Non-empty path from `key`, if set.
fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}
