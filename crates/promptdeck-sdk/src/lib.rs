//! # PromptDeck SDK
//!
//! The `Session` owns the one workflow document being edited together with the
//! backend metadata, model registry and submission history of this run. Front-ends
//! (the console, or anything else) drive every operation through it.

pub mod activity;
pub mod poll;

use activity::{ActivityLog, NoticeLevel};
use anyhow::Context;
use poll::PendingPoll;
use promptdeck_core::backend::BackendClient;
use promptdeck_core::config::Settings;
use promptdeck_core::domain::{NodeId, OutputImage, PromptHistory, Workflow};
use promptdeck_core::error::{PromptDeckError, Result};
use promptdeck_core::schema::{ObjectInfo, SchemaResolver};
use promptdeck_core::store::{ModelEntry, ModelRegistry, NewModel, WorkflowStore};
use promptdeck_inspector::NodeView;
use std::time::Duration;
use url::Url;

pub struct Session {
    client: BackendClient,
    store: WorkflowStore,
    workflow: Workflow,
    resolver: SchemaResolver,
    registry: ModelRegistry,
    history: PromptHistory,
    activity: ActivityLog,
    poll_delay: Duration,
}

impl Session {
    /// Loads the workflow and model registry named by `settings`. Metadata starts
    /// absent; call [`Session::refresh_metadata`] to fetch it.
    pub fn open(settings: &Settings) -> anyhow::Result<Self> {
        let client = BackendClient::from_settings(settings)?;
        let store = WorkflowStore::new(&settings.workflow_file);
        let workflow = store
            .load()
            .with_context(|| format!("Could not open workflow {:?}", settings.workflow_file))?;
        let registry = ModelRegistry::open(settings.models_file())
            .with_context(|| format!("Could not open model registry in {:?}", settings.data_dir))?;

        Ok(Self::new(client, store, workflow, registry).with_poll_delay(settings.poll_delay))
    }

    pub fn new(
        client: BackendClient,
        store: WorkflowStore,
        workflow: Workflow,
        registry: ModelRegistry,
    ) -> Self {
        Self {
            client,
            store,
            workflow,
            resolver: SchemaResolver::degraded(),
            registry,
            history: PromptHistory::default(),
            activity: ActivityLog::default(),
            poll_delay: Duration::from_millis(promptdeck_core::config::DEFAULT_POLL_DELAY_MS),
        }
    }

    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn backend_url(&self) -> &Url {
        self.client.base_url()
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn resolver(&self) -> &SchemaResolver {
        &self.resolver
    }

    pub fn history(&self) -> &PromptHistory {
        &self.history
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    // --- Metadata ---

    /// Fetches `object_info`. On failure the previous metadata (if any) stays in
    /// effect, a warning is recorded and `false` is returned.
    pub async fn refresh_metadata(&mut self) -> bool {
        match self.client.object_info().await {
            Ok(info) => {
                self.apply_metadata(info);
                true
            }
            Err(e) => {
                self.activity.push(
                    NoticeLevel::Warning,
                    format!("Could not fetch backend metadata: {e}"),
                );
                false
            }
        }
    }

    pub fn apply_metadata(&mut self, info: ObjectInfo) {
        tracing::info!(node_types = info.len(), "Metadata refreshed");
        self.resolver.replace(info);
        self.activity
            .push(NoticeLevel::Success, "Backend metadata refreshed");
    }

    // --- Editing ---

    /// Editable models for every node, sorted for display and derived from live state.
    pub fn views(&self) -> Vec<NodeView> {
        promptdeck_inspector::inspect_workflow(
            &self.workflow,
            &self.resolver,
            &self.registry.names(),
        )
    }

    pub fn node_view(&self, node_id: NodeId) -> Result<NodeView> {
        let node = self
            .workflow
            .node(node_id)
            .ok_or_else(|| node_not_found(node_id))?;
        Ok(promptdeck_inspector::inspect_node(
            node,
            &self.resolver,
            &self.registry.names(),
        ))
    }

    pub fn edit(&mut self, node_id: NodeId, index: usize, raw: impl Into<String>) -> Result<()> {
        let node = self
            .workflow
            .node_mut(node_id)
            .ok_or_else(|| node_not_found(node_id))?;
        promptdeck_inspector::apply_edit(node, index, raw)
    }

    pub fn edit_by_name(
        &mut self,
        node_id: NodeId,
        input_name: &str,
        raw: impl Into<String>,
    ) -> Result<()> {
        let node = self
            .workflow
            .node_mut(node_id)
            .ok_or_else(|| node_not_found(node_id))?;
        promptdeck_inspector::apply_edit_by_name(node, input_name, raw)
    }

    /// Flips a node between enabled and bypassed; returns the new state.
    pub fn toggle(&mut self, node_id: NodeId) -> Result<bool> {
        let node = self
            .workflow
            .node_mut(node_id)
            .ok_or_else(|| node_not_found(node_id))?;
        Ok(promptdeck_inspector::toggle_enabled(node))
    }

    pub fn set_enabled(&mut self, node_id: NodeId, enabled: bool) -> Result<()> {
        let node = self
            .workflow
            .node_mut(node_id)
            .ok_or_else(|| node_not_found(node_id))?;
        promptdeck_inspector::set_enabled(node, enabled);
        Ok(())
    }

    /// Writes the whole workflow back to its file.
    pub fn save(&mut self) -> Result<()> {
        match self.store.save(&self.workflow) {
            Ok(()) => {
                self.activity.push(NoticeLevel::Success, "Workflow saved");
                Ok(())
            }
            Err(e) => {
                self.activity.push(NoticeLevel::Error, e.to_string());
                Err(e)
            }
        }
    }

    /// Discards in-memory edits and re-reads the workflow file.
    pub fn reload(&mut self) -> Result<()> {
        self.workflow = self.store.load()?;
        Ok(())
    }

    // --- Models ---

    pub fn models(&self) -> &[ModelEntry] {
        self.registry.list()
    }

    pub fn register_model(&mut self, request: NewModel) -> Result<ModelEntry> {
        self.registry.create(request)
    }

    pub fn remove_model(&mut self, id: &str) -> Result<()> {
        self.registry.delete(id)
    }

    // --- Execution ---

    /// Submits the current workflow. Returns the backend's prompt id, if it sent one;
    /// only submissions with an id enter the history.
    pub async fn submit(&mut self) -> Result<Option<String>> {
        self.activity.push(NoticeLevel::Info, "Submitting workflow…");
        match self.client.submit(&self.workflow).await {
            Ok(submission) => {
                let id = submission.prompt_id;
                self.activity.push(
                    NoticeLevel::Success,
                    format!("Submitted prompt: {}", id.as_deref().unwrap_or("unknown")),
                );
                if let Some(id) = &id {
                    self.history.record_submission(id.clone());
                }
                Ok(id)
            }
            Err(e) => {
                self.activity.push(NoticeLevel::Error, e.to_string());
                Err(e)
            }
        }
    }

    /// Starts the single delayed result check for `prompt_id`.
    pub fn schedule_poll(&self, prompt_id: impl Into<String>) -> PendingPoll {
        PendingPoll::spawn(self.client.clone(), prompt_id.into(), self.poll_delay)
    }

    /// Waits for a scheduled check and records its outcome. Returns the number of
    /// images attached; a cancelled check attaches nothing.
    pub async fn complete_poll(&mut self, poll: PendingPoll) -> Result<usize> {
        let prompt_id = poll.prompt_id().to_string();
        match poll.wait().await {
            Some(result) => self.record_poll(&prompt_id, result),
            None => Ok(0),
        }
    }

    /// Checks for outputs right now.
    pub async fn poll_once(&mut self, prompt_id: &str) -> Result<usize> {
        let result = self.client.output_images(prompt_id).await;
        self.record_poll(prompt_id, result)
    }

    /// Re-checks the most recent submission.
    pub async fn refresh_latest(&mut self) -> Result<usize> {
        let Some(latest) = self.history.latest() else {
            let message = "No submissions yet; run the workflow first";
            self.activity.push(NoticeLevel::Warning, message);
            return Err(PromptDeckError::NotFound(message.to_string()));
        };
        let prompt_id = latest.prompt_id.clone();
        self.poll_once(&prompt_id).await
    }

    fn record_poll(&mut self, prompt_id: &str, result: Result<Vec<OutputImage>>) -> Result<usize> {
        match result {
            Ok(images) => {
                let count = images.len();
                tracing::info!(prompt_id = %prompt_id, count, "Outputs collected");
                self.history.attach_images(prompt_id, images);
                Ok(count)
            }
            Err(e) => {
                self.activity.push(NoticeLevel::Warning, e.to_string());
                Err(e)
            }
        }
    }

    pub fn image_url(&self, image: &OutputImage) -> Result<Url> {
        self.client.view_url(image)
    }

    pub async fn fetch_image(&self, image: &OutputImage) -> Result<Vec<u8>> {
        self.client.fetch_image(image).await
    }
}

fn node_not_found(node_id: NodeId) -> PromptDeckError {
    PromptDeckError::NotFound(format!("node {node_id} not found"))
}
