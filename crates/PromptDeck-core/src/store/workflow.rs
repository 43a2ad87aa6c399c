use crate::domain::Workflow;
use crate::error::{PromptDeckError, Result};
use std::path::{Path, PathBuf};

/// The on-disk workflow document. Loads and saves are always whole-document.
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    path: PathBuf,
}

impl WorkflowStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[tracing::instrument(skip(self), fields(path = ?self.path))]
    pub fn load(&self) -> Result<Workflow> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            PromptDeckError::storage(format!("Failed to read workflow {:?}", self.path), e)
        })?;
        let workflow: Workflow = serde_json::from_str(&raw).map_err(|e| {
            PromptDeckError::parse(format!("Failed to parse workflow {:?}", self.path), e)
        })?;
        tracing::info!(node_count = workflow.nodes.len(), "Loaded workflow");
        Ok(workflow)
    }

    #[tracing::instrument(skip(self, workflow), fields(path = ?self.path))]
    pub fn save(&self, workflow: &Workflow) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(workflow)
            .map_err(|e| PromptDeckError::parse("Failed to serialize workflow", e))?;
        super::write_atomic(&self.path, &bytes)?;
        tracing::info!(node_count = workflow.nodes.len(), "Saved workflow");
        Ok(())
    }
}
