use promptdeck_core::backend::BackendClient;
use promptdeck_core::domain::OutputImage;
use promptdeck_core::error::{PromptDeckError, Result};
use std::time::Duration;
use tokio::task::JoinHandle;

/// A single delayed result check for one submission.
///
/// The check runs once after the delay and is never retried. Dropping the handle
/// cancels it if it has not finished.
#[derive(Debug)]
pub struct PendingPoll {
    prompt_id: String,
    handle: Option<JoinHandle<Result<Vec<OutputImage>>>>,
}

impl PendingPoll {
    pub(crate) fn spawn(client: BackendClient, prompt_id: String, delay: Duration) -> Self {
        let id = prompt_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(prompt_id = %id, "Polling for outputs");
            client.output_images(&id).await
        });
        Self {
            prompt_id,
            handle: Some(handle),
        }
    }

    pub fn prompt_id(&self) -> &str {
        &self.prompt_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(prompt_id = %self.prompt_id, "Poll cancelled");
        }
    }

    /// Waits for the check. `None` means it was cancelled before producing a result.
    pub async fn wait(mut self) -> Option<Result<Vec<OutputImage>>> {
        let handle = self.handle.take()?;
        match handle.await {
            Ok(result) => Some(result),
            Err(e) if e.is_cancelled() => None,
            Err(e) => Some(Err(PromptDeckError::Upstream(format!(
                "Result poll for {} failed: {e}",
                self.prompt_id
            )))),
        }
    }
}

impl Drop for PendingPoll {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
