use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8188";
pub const DEFAULT_WORKFLOW_FILE: &str = "workflow.json";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_POLL_DELAY_MS: u64 = 2000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Runtime settings, read from the environment (and an optional `.env` file).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the ComfyUI-compatible backend.
    pub backend_url: String,
    /// The workflow document being edited.
    pub workflow_file: PathBuf,
    /// Directory holding `models.json`.
    pub data_dir: PathBuf,
    /// Delay before the single result poll after a submission.
    pub poll_delay: Duration,
    /// Per-request timeout for backend calls.
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            workflow_file: PathBuf::from(DEFAULT_WORKFLOW_FILE),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            poll_delay: Duration::from_millis(DEFAULT_POLL_DELAY_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Loads settings from `COMFYUI_BASE_URL`, `WORKFLOW_FILE`, `PROMPTDECK_DATA_DIR`,
    /// `PROMPTDECK_POLL_DELAY_MS` and `PROMPTDECK_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        let mut settings = Self::default();

        if let Ok(raw) = std::env::var("COMFYUI_BASE_URL") {
            settings = settings.with_backend_url(&raw)?;
        }
        if let Ok(path) = std::env::var("WORKFLOW_FILE") {
            settings.workflow_file = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("PROMPTDECK_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var("PROMPTDECK_POLL_DELAY_MS") {
            let ms: u64 = raw
                .parse()
                .with_context(|| format!("PROMPTDECK_POLL_DELAY_MS is not a number: {raw}"))?;
            settings.poll_delay = Duration::from_millis(ms);
        }
        if let Ok(raw) = std::env::var("PROMPTDECK_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("PROMPTDECK_HTTP_TIMEOUT_SECS is not a number: {raw}"))?;
            settings.http_timeout = Duration::from_secs(secs);
        }

        tracing::debug!(backend = %settings.backend_url, workflow = ?settings.workflow_file, "Settings loaded");
        Ok(settings)
    }

    pub fn with_backend_url(mut self, raw: &str) -> anyhow::Result<Self> {
        Url::parse(raw).with_context(|| format!("Invalid backend URL: {raw}"))?;
        self.backend_url = raw.to_string();
        Ok(self)
    }

    pub fn models_file(&self) -> PathBuf {
        self.data_dir.join("models.json")
    }
}
