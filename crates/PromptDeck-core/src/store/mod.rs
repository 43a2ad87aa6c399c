pub mod models;
pub mod workflow;

pub use models::{ModelEntry, ModelRegistry, NewModel};
pub use workflow::WorkflowStore;

use crate::error::{PromptDeckError, Result};
use std::path::Path;

/// Writes `bytes` next to `path` and renames over it, so readers never see half a file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| PromptDeckError::storage(format!("Failed to create {parent:?}"), e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, bytes)
        .map_err(|e| PromptDeckError::storage(format!("Failed to write {tmp_path:?}"), e))?;
    std::fs::rename(&tmp_path, path)
        .map_err(|e| PromptDeckError::storage(format!("Failed to replace {path:?}"), e))
}
