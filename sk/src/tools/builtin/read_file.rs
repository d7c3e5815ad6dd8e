//! read_file tool - read the leading lines of a file in the sandbox

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::config::ReadFileConfig;
use crate::tools::params::{optional_positive, required_str};
use crate::tools::{InstanceId, InstanceStore, ParamType, Sandbox, Tool, ToolDescriptor, ToolError, ToolResult};

#[derive(Debug, Default)]
struct ReadStats {
    files_read: Vec<String>,
    total_lines_read: usize,
    successful_reads: u64,
}

/// Lines pulled from a file
#[derive(Debug)]
struct Excerpt {
    content: String,
    lines_read: usize,
    truncated: bool,
}

/// Read files from the sandbox root using relative paths
pub struct ReadFileTool {
    descriptor: ToolDescriptor,
    sandbox: Sandbox,
    config: ReadFileConfig,
    store: InstanceStore<ReadStats>,
}

impl ReadFileTool {
    pub fn new(sandbox: Sandbox, config: ReadFileConfig) -> Self {
        let descriptor = ToolDescriptor::new(
            "read_file",
            "Read files from the sandbox root using relative paths. Can read a specific number of lines from the beginning of the file.",
        )
        .required_param(
            "filepath",
            ParamType::String,
            "Relative path to the file (e.g., 'src/lib.rs', 'README.md')",
        )
        .param(
            "num_lines",
            ParamType::Integer,
            "Number of lines to read from the beginning of the file (optional, defaults to entire file)",
        );

        Self {
            descriptor,
            sandbox,
            config,
            store: InstanceStore::new("read_file"),
        }
    }

    fn check_extension(&self, full_path: &Path, filepath: &str) -> Result<(), ToolError> {
        let allowed = &self.config.allowed_extensions;
        if allowed.is_empty() {
            return Ok(());
        }

        let ext = full_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let permitted = allowed
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext) && !ext.is_empty());

        if permitted {
            Ok(())
        } else {
            Err(ToolError::ForbiddenExtension {
                path: filepath.to_string(),
                allowed: allowed.clone(),
            })
        }
    }

    async fn read(&self, instance_id: &str, params: &Value) -> Result<ToolResult, ToolError> {
        self.store.ensure(instance_id).await?;
        let filepath = required_str(params, "filepath")?.trim();
        let num_lines = optional_positive(params, "num_lines")?.map(|n| n as usize);

        let full_path = self.sandbox.resolve(filepath)?;
        if !full_path.is_file() {
            debug!(?full_path, "ReadFileTool::read: not a regular file");
            return Err(ToolError::FileNotFound {
                path: filepath.to_string(),
            });
        }
        self.check_extension(&full_path, filepath)?;

        let file_size = tokio::fs::metadata(&full_path).await?.len();
        if file_size > self.config.max_file_size {
            return Err(ToolError::FileTooLarge {
                size: file_size,
                max: self.config.max_file_size,
            });
        }

        let excerpt = read_lines(&full_path, num_lines, self.config.max_lines).await?;
        debug!(lines_read = excerpt.lines_read, truncated = excerpt.truncated, "ReadFileTool::read: file read");

        self.store
            .with(instance_id, |stats| {
                stats.files_read.push(filepath.to_string());
                stats.total_lines_read += excerpt.lines_read;
                stats.successful_reads += 1;
            })
            .await?;

        let mut lines = vec![format!("File: {}", filepath), format!("Lines read: {}", excerpt.lines_read)];
        if excerpt.truncated {
            lines.push("(Content truncated)".to_string());
        }
        lines.extend([String::new(), "Content:".to_string(), "```".to_string()]);
        lines.push(excerpt.content);
        lines.push("```".to_string());

        Ok(ToolResult::success(lines.join("\n"), 1.0)
            .with("filepath", filepath)
            .with("full_path", full_path.display().to_string())
            .with("lines_read", excerpt.lines_read)
            .with("file_size", file_size)
            .with("truncated", excerpt.truncated))
    }
}

/// Read up to `min(requested, max_lines)` lines, decoding invalid UTF-8 lossily
async fn read_lines(path: &Path, requested: Option<usize>, max_lines: usize) -> Result<Excerpt, ToolError> {
    let limit = requested.map_or(max_lines, |n| n.min(max_lines));
    let mut reader = BufReader::new(tokio::fs::File::open(path).await?);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    let mut truncated = false;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        if lines.len() >= limit {
            truncated = true;
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(['\n', '\r']).to_string());
    }

    let lines_read = lines.len();
    if !truncated {
        if let Some(n) = requested {
            if lines_read == n {
                // Best effort: the file may have grown since the first pass
                truncated = count_lines(path).await.is_some_and(|total| total > n);
            }
        }
    }

    Ok(Excerpt {
        content: lines.join("\n"),
        lines_read,
        truncated,
    })
}

async fn count_lines(path: &Path) -> Option<usize> {
    let mut reader = BufReader::new(tokio::fs::File::open(path).await.ok()?);
    let mut buf = Vec::new();
    let mut total = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return Some(total),
            Ok(_) => total += 1,
            Err(_) => return None,
        }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn create(&self, instance_id: Option<InstanceId>) -> (InstanceId, ToolResult) {
        let id = self.store.create(instance_id, ReadStats::default).await;
        let text = format!("File reader ready. Base directory: {}", self.sandbox.root().display());
        (id, ToolResult::success(text, 0.0))
    }

    async fn execute(&self, instance_id: &str, params: &Value) -> ToolResult {
        debug!(%instance_id, ?params, "ReadFileTool::execute: called");
        self.read(instance_id, params)
            .await
            .unwrap_or_else(|e| ToolResult::from_error(&e))
    }

    async fn calc_reward(&self, instance_id: &str) -> Result<f64, ToolError> {
        self.store
            .with(instance_id, |stats| stats.successful_reads as f64)
            .await
    }

    async fn release(&self, instance_id: &str) -> Result<(), ToolError> {
        let stats = self.store.release(instance_id).await?;
        debug!(
            %instance_id,
            files_read = stats.files_read.len(),
            total_lines = stats.total_lines_read,
            "ReadFileTool::release: instance summary"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn tool_in(dir: &Path, config: ReadFileConfig) -> ReadFileTool {
        ReadFileTool::new(Sandbox::new(dir).unwrap(), config)
    }

    #[tokio::test]
    async fn test_read_file_basic() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("test.txt"), "line 1\r\nline 2\nline 3").unwrap();
        let tool = tool_in(temp.path(), ReadFileConfig::default());
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({"filepath": "test.txt"})).await;

        assert!(!result.is_error());
        assert_eq!(result.reward, 1.0);
        assert_eq!(
            result.text,
            "File: test.txt\nLines read: 3\n\nContent:\n```\nline 1\nline 2\nline 3\n```"
        );
        assert_eq!(result.metadata["lines_read"], 3);
        assert_eq!(result.metadata["truncated"], false);
    }

    #[tokio::test]
    async fn test_read_file_num_lines_truncates() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("test.txt"), "a\nb\nc\nd\n").unwrap();
        let tool = tool_in(temp.path(), ReadFileConfig::default());
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({"filepath": "test.txt", "num_lines": 2})).await;

        assert!(result.text.contains("Lines read: 2\n(Content truncated)"));
        assert!(result.text.contains("a\nb\n```"));
        assert_eq!(result.metadata["truncated"], true);
    }

    #[tokio::test]
    async fn test_read_file_exact_line_count_not_truncated() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("test.txt"), "a\nb\n").unwrap();
        let tool = tool_in(temp.path(), ReadFileConfig::default());
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({"filepath": "test.txt", "num_lines": 2})).await;

        assert_eq!(result.metadata["truncated"], false);
    }

    #[tokio::test]
    async fn test_read_file_max_lines_cap() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("big.txt"), "1\n2\n3\n4\n5\n").unwrap();
        let config = ReadFileConfig {
            max_lines: 3,
            ..Default::default()
        };
        let tool = tool_in(temp.path(), config);
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({"filepath": "big.txt", "num_lines": 100})).await;

        assert_eq!(result.metadata["lines_read"], 3);
        assert_eq!(result.metadata["truncated"], true);
    }

    #[tokio::test]
    async fn test_read_file_lossy_decoding() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("bin.dat"), [b'o', b'k', 0xff, b'\n']).unwrap();
        let tool = tool_in(temp.path(), ReadFileConfig::default());
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({"filepath": "bin.dat"})).await;

        assert!(!result.is_error());
        assert!(result.text.contains("ok\u{fffd}"));
    }

    #[tokio::test]
    async fn test_read_file_not_found() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("subdir")).unwrap();
        let tool = tool_in(temp.path(), ReadFileConfig::default());
        let (id, _) = tool.create(None).await;

        let missing = tool.execute(&id, &json!({"filepath": "nonexistent.txt"})).await;
        assert_eq!(missing.error_kind(), Some("not_found"));
        assert_eq!(missing.metadata["reason"], "file_not_found");

        let dir = tool.execute(&id, &json!({"filepath": "subdir"})).await;
        assert_eq!(dir.error_kind(), Some("not_found"));
    }

    #[tokio::test]
    async fn test_read_file_outside_sandbox() {
        let outer = tempdir().unwrap();
        let root = outer.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(outer.path().join("secret.txt"), "secret").unwrap();
        let tool = tool_in(&root, ReadFileConfig::default());
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({"filepath": "../secret.txt"})).await;

        assert_eq!(result.error_kind(), Some("forbidden"));
        assert!(!result.text.contains("secret\n"));
    }

    #[tokio::test]
    async fn test_read_file_extension_allow_list() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("main.RS"), "fn main() {}").unwrap();
        fs::write(temp.path().join("notes.txt"), "notes").unwrap();
        fs::write(temp.path().join("Makefile"), "all:").unwrap();
        let config = ReadFileConfig {
            allowed_extensions: vec![".rs".to_string(), "md".to_string()],
            ..Default::default()
        };
        let tool = tool_in(temp.path(), config);
        let (id, _) = tool.create(None).await;

        assert!(!tool.execute(&id, &json!({"filepath": "main.RS"})).await.is_error());

        let txt = tool.execute(&id, &json!({"filepath": "notes.txt"})).await;
        assert_eq!(txt.metadata["reason"], "forbidden_extension");

        let bare = tool.execute(&id, &json!({"filepath": "Makefile"})).await;
        assert_eq!(bare.error_kind(), Some("forbidden"));
    }

    #[tokio::test]
    async fn test_read_file_too_large() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("big.txt"), "x".repeat(64)).unwrap();
        let config = ReadFileConfig {
            max_file_size: 16,
            ..Default::default()
        };
        let tool = tool_in(temp.path(), config);
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({"filepath": "big.txt"})).await;

        assert_eq!(result.error_kind(), Some("resource_limit"));
        assert!(result.text.contains("64 bytes"));
    }

    #[tokio::test]
    async fn test_read_file_invalid_num_lines() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        let tool = tool_in(temp.path(), ReadFileConfig::default());
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({"filepath": "a.txt", "num_lines": 0})).await;
        assert_eq!(result.error_kind(), Some("invalid_argument"));
    }

    #[tokio::test]
    async fn test_calc_reward_counts_successful_reads() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        let tool = tool_in(temp.path(), ReadFileConfig::default());
        let (id, _) = tool.create(None).await;

        tool.execute(&id, &json!({"filepath": "a.txt"})).await;
        tool.execute(&id, &json!({"filepath": "missing.txt"})).await;
        tool.execute(&id, &json!({"filepath": "/a.txt"})).await;

        assert_eq!(tool.calc_reward(&id).await.unwrap(), 2.0);
    }
}
