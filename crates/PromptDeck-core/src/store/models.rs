use crate::error::{PromptDeckError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A model the operator registered by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub note: String,
    pub added_at: DateTime<Utc>,
}

/// A registration request. `name` and `model_type` are mandatory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewModel {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub model_type: Option<String>,
    pub path: Option<String>,
    pub note: Option<String>,
}

impl NewModel {
    pub fn new(name: impl Into<String>, model_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            model_type: Some(model_type.into()),
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

/// The model registry file (`{"models": [...]}`) and its in-memory snapshot.
///
/// Every mutation writes the whole file before the snapshot changes, so a failed write
/// leaves both untouched.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    path: PathBuf,
    models: Vec<ModelEntry>,
}

impl ModelRegistry {
    /// Opens the registry at `path`, creating an empty one if the file is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::info!(path = ?path, "Creating empty model registry");
            persist(&path, &[])?;
        }
        let models = read(&path)?;
        Ok(Self { path, models })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in insertion order.
    pub fn list(&self) -> &[ModelEntry] {
        &self.models
    }

    pub fn names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name.clone()).collect()
    }

    /// Re-reads the file, picking up changes made by other processes.
    pub fn reload(&mut self) -> Result<()> {
        self.models = read(&self.path)?;
        Ok(())
    }

    pub fn create(&mut self, request: NewModel) -> Result<ModelEntry> {
        let name = request.name.filter(|s| !s.is_empty());
        let model_type = request.model_type.filter(|s| !s.is_empty());
        let (Some(name), Some(model_type)) = (name, model_type) else {
            return Err(PromptDeckError::Validation(
                "name and type are required".to_string(),
            ));
        };

        let entry = ModelEntry {
            id: Uuid::new_v4().to_string(),
            name,
            model_type,
            path: request.path.unwrap_or_default(),
            note: request.note.unwrap_or_default(),
            added_at: Utc::now(),
        };

        let mut next = self.models.clone();
        next.push(entry.clone());
        persist(&self.path, &next)?;
        self.models = next;

        tracing::info!(model_id = %entry.id, name = %entry.name, "Registered model");
        Ok(entry)
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        let next: Vec<ModelEntry> = self.models.iter().filter(|m| m.id != id).cloned().collect();
        if next.len() == self.models.len() {
            return Err(PromptDeckError::NotFound("model not found".to_string()));
        }
        persist(&self.path, &next)?;
        self.models = next;

        tracing::info!(model_id = %id, "Removed model");
        Ok(())
    }
}

fn read(path: &Path) -> Result<Vec<ModelEntry>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| PromptDeckError::storage(format!("Failed to read registry {path:?}"), e))?;
    let file: RegistryFile = serde_json::from_str(&raw)
        .map_err(|e| PromptDeckError::parse(format!("Failed to parse registry {path:?}"), e))?;
    Ok(file.models)
}

fn persist(path: &Path, models: &[ModelEntry]) -> Result<()> {
    let file = RegistryFile {
        models: models.to_vec(),
    };
    let bytes = serde_json::to_vec_pretty(&file)
        .map_err(|e| PromptDeckError::parse("Failed to serialize registry", e))?;
    super::write_atomic(path, &bytes)
}
