//! edit_file tool - replace the first occurrence of a string in a file

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::EditFileConfig;
use crate::tools::params::{present_str, required_str};
use crate::tools::{InstanceId, InstanceStore, ParamType, Sandbox, Tool, ToolDescriptor, ToolError, ToolResult};

#[derive(Debug, Default)]
struct EditStats {
    edits_made: u64,
    files_edited: Vec<String>,
}

/// Edit a file by exact string replacement
///
/// Only the first occurrence of `old_string` is replaced. With backups
/// enabled the original content is written to `<path>.bak` strictly before
/// the file itself is overwritten; the two writes are not atomic together.
pub struct EditFileTool {
    descriptor: ToolDescriptor,
    sandbox: Sandbox,
    config: EditFileConfig,
    store: InstanceStore<EditStats>,
}

impl EditFileTool {
    pub fn new(sandbox: Sandbox, config: EditFileConfig) -> Self {
        let descriptor = ToolDescriptor::new(
            "edit_file",
            "Edit a file by replacing the first occurrence of old_string with new_string.",
        )
        .required_param("filepath", ParamType::String, "Relative path to the file to edit")
        .required_param("old_string", ParamType::String, "Exact text to replace")
        .required_param("new_string", ParamType::String, "Replacement text");

        Self {
            descriptor,
            sandbox,
            config,
            store: InstanceStore::new("edit_file"),
        }
    }

    async fn edit(&self, instance_id: &str, params: &Value) -> Result<ToolResult, ToolError> {
        self.store.ensure(instance_id).await?;
        let filepath = required_str(params, "filepath")?.trim();
        let old_string = present_str(params, "old_string")?;
        if old_string.is_empty() {
            return Err(ToolError::missing("old_string"));
        }
        let new_string = present_str(params, "new_string")?;

        let full_path = self.sandbox.resolve(filepath)?;
        if !full_path.is_file() {
            return Err(ToolError::FileNotFound {
                path: filepath.to_string(),
            });
        }

        let size = tokio::fs::metadata(&full_path).await?.len();
        if size > self.config.max_file_size {
            return Err(ToolError::FileTooLarge {
                size,
                max: self.config.max_file_size,
            });
        }

        let bytes = tokio::fs::read(&full_path).await?;
        let content = String::from_utf8(bytes).map_err(|_| ToolError::Decode {
            path: filepath.to_string(),
        })?;

        if !content.contains(old_string) {
            debug!(%filepath, "EditFileTool::edit: old_string not found");
            return Err(ToolError::PatternNotFound {
                path: filepath.to_string(),
            });
        }
        let updated = content.replacen(old_string, new_string, 1);

        // The backup path is confined like any other; an existing .bak symlink
        // pointing outside the root is rejected before anything is written
        let backup_path = if self.config.create_backup {
            let relative = self.sandbox.display_path(&backup_path_for(&full_path));
            Some(self.sandbox.resolve(&relative)?)
        } else {
            None
        };

        // Backup must land before the original is touched
        let backup = match &backup_path {
            Some(path) => {
                tokio::fs::write(path, content.as_bytes()).await?;
                debug!(?path, "EditFileTool::edit: backup written");
                Some(self.sandbox.display_path(path))
            }
            None => None,
        };

        tokio::fs::write(&full_path, updated.as_bytes()).await?;
        info!(%filepath, "Edited file");

        self.store
            .with(instance_id, |stats| {
                stats.edits_made += 1;
                stats.files_edited.push(filepath.to_string());
            })
            .await?;

        let mut text = format!("Successfully edited {}\nReplaced 1 occurrence", filepath);
        if let Some(backup) = &backup {
            text.push_str(&format!("\nBackup: {}", backup));
        }

        Ok(ToolResult::success(text, 1.0)
            .with("filepath", filepath)
            .with("replacements", 1)
            .with("backup", backup))
    }
}

/// Sibling path with `.bak` appended to the full file name
fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

#[async_trait]
impl Tool for EditFileTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn create(&self, instance_id: Option<InstanceId>) -> (InstanceId, ToolResult) {
        let id = self.store.create(instance_id, EditStats::default).await;
        let text = format!("File editor ready. Directory: {}", self.sandbox.root().display());
        (id, ToolResult::success(text, 0.0))
    }

    async fn execute(&self, instance_id: &str, params: &Value) -> ToolResult {
        debug!(%instance_id, "EditFileTool::execute: called");
        self.edit(instance_id, params)
            .await
            .unwrap_or_else(|e| ToolResult::from_error(&e))
    }

    async fn calc_reward(&self, instance_id: &str) -> Result<f64, ToolError> {
        self.store.with(instance_id, |stats| stats.edits_made as f64).await
    }

    async fn release(&self, instance_id: &str) -> Result<(), ToolError> {
        let stats = self.store.release(instance_id).await?;
        debug!(%instance_id, edits = stats.edits_made, files = ?stats.files_edited, "EditFileTool::release: instance summary");
        Ok(())
    }
}
