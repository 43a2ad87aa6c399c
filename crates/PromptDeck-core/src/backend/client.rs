use crate::config::Settings;
use crate::domain::{OutputImage, Workflow, collect_images};
use crate::error::{PromptDeckError, Result};
use crate::schema::ObjectInfo;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

/// The backend's answer to a successful `POST /prompt`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub prompt_id: Option<String>,
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub node_errors: Option<Value>,
}

/// HTTP client for the ComfyUI-compatible backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url).map_err(|e| {
            PromptDeckError::Validation(format!("Invalid backend URL {base_url}: {e}"))
        })?;
        // Keep any path prefix when joining endpoint names.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, http })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.backend_url, settings.http_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| PromptDeckError::Validation(format!("Invalid endpoint {path}: {e}")))
    }

    /// Fetches the per-node-type parameter schemas.
    #[tracing::instrument(skip(self), fields(url = %self.base))]
    pub async fn object_info(&self) -> Result<ObjectInfo> {
        let resp = self.http.get(self.endpoint("object_info")?).send().await?;
        if !resp.status().is_success() {
            return Err(PromptDeckError::Upstream(format!(
                "Could not fetch backend metadata (HTTP {})",
                resp.status()
            )));
        }
        let info: ObjectInfo = resp.json().await?;
        tracing::info!(node_types = info.len(), "Fetched object_info");
        Ok(info)
    }

    /// Queues the whole workflow for execution.
    #[tracing::instrument(skip(self, workflow), fields(url = %self.base))]
    pub async fn submit(&self, workflow: &Workflow) -> Result<Submission> {
        let resp = self
            .http
            .post(self.endpoint("prompt")?)
            .json(&json!({ "prompt": workflow }))
            .send()
            .await?;

        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = error_message(&body)
                .unwrap_or_else(|| format!("Run failed (HTTP {status})"));
            tracing::warn!(status = %status, error = %message, "Submission rejected");
            return Err(PromptDeckError::Upstream(message));
        }

        let submission: Submission = serde_json::from_value(body)
            .map_err(|e| PromptDeckError::parse("Unexpected submission response", e))?;
        tracing::info!(prompt_id = ?submission.prompt_id, "Workflow submitted");
        Ok(submission)
    }

    /// Raw `/history/<prompt_id>` document.
    #[tracing::instrument(skip(self), fields(url = %self.base))]
    pub async fn history(&self, prompt_id: &str) -> Result<Value> {
        let resp = self
            .http
            .get(self.endpoint(&format!("history/{prompt_id}"))?)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(PromptDeckError::Upstream(format!(
                "Could not fetch history for {prompt_id} (HTTP {})",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }

    pub async fn output_images(&self, prompt_id: &str) -> Result<Vec<OutputImage>> {
        let history = self.history(prompt_id).await?;
        Ok(collect_images(prompt_id, &history))
    }

    /// Where the backend serves `image`.
    pub fn view_url(&self, image: &OutputImage) -> Result<Url> {
        let mut url = self.endpoint("view")?;
        url.query_pairs_mut()
            .append_pair("filename", &image.filename)
            .append_pair("type", &image.image_type)
            .append_pair("subfolder", &image.subfolder);
        Ok(url)
    }

    #[tracing::instrument(skip(self, image), fields(filename = %image.filename))]
    pub async fn fetch_image(&self, image: &OutputImage) -> Result<Vec<u8>> {
        let resp = self.http.get(self.view_url(image)?).send().await?;
        if !resp.status().is_success() {
            return Err(PromptDeckError::Upstream(format!(
                "Could not fetch image {} (HTTP {})",
                image.filename,
                resp.status()
            )));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// `{"error": "text"}` or `{"error": {"message": "text", ...}}`.
fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
