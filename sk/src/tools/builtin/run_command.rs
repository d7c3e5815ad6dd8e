//! bash tool - execute shell commands inside the sandbox root

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BashConfig;
use crate::tools::exec::{self, ExecLimits, ExecRequest};
use crate::tools::params::{optional_positive, required_str};
use crate::tools::{InstanceId, InstanceStore, ParamType, Sandbox, Tool, ToolDescriptor, ToolError, ToolResult};

/// One command that reached the execution engine
#[derive(Debug, Clone)]
struct CommandRecord {
    command: String,
    success: bool,
    exit_code: Option<i32>,
    output_length: usize,
}

#[derive(Debug, Default)]
struct CommandHistory {
    records: Vec<CommandRecord>,
}

impl CommandHistory {
    fn successes(&self) -> usize {
        self.records.iter().filter(|r| r.success).count()
    }

    /// Bytes of output produced across all commands
    fn total_output(&self) -> usize {
        self.records.iter().map(|r| r.output_length).sum()
    }

    /// Exit codes of failed commands; `None` for signal deaths, timeouts and spawn failures
    fn failed_exit_codes(&self) -> Vec<Option<i32>> {
        self.records.iter().filter(|r| !r.success).map(|r| r.exit_code).collect()
    }

    fn success_rate(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            self.successes() as f64 / self.records.len() as f64
        }
    }
}

/// Execute a shell command with the sandbox root as working directory
pub struct RunCommandTool {
    descriptor: ToolDescriptor,
    sandbox: Sandbox,
    config: BashConfig,
    shell: PathBuf,
    store: InstanceStore<CommandHistory>,
}

impl RunCommandTool {
    pub fn new(sandbox: Sandbox, config: BashConfig) -> Self {
        let descriptor = ToolDescriptor::new("bash", "Execute bash commands in the sandbox root directory.")
            .required_param("command", ParamType::String, "The bash command to execute.")
            .param(
                "timeout",
                ParamType::Integer,
                &format!(
                    "Timeout for command execution in seconds (optional, defaults to {}).",
                    config.timeout_secs
                ),
            );
        let shell = exec::resolve_shell(&config.shell);

        Self {
            descriptor,
            sandbox,
            config,
            shell,
            store: InstanceStore::new("bash"),
        }
    }

    fn check_allowed(&self, command: &str) -> Result<(), ToolError> {
        let allowed = &self.config.allowed_commands;
        if allowed.is_empty() {
            return Ok(());
        }

        let trimmed = command.trim();
        if allowed.iter().any(|prefix| trimmed.starts_with(prefix.as_str())) {
            Ok(())
        } else {
            warn!(%command, "Rejected command outside allow-list");
            Err(ToolError::ForbiddenCommand {
                command: command.to_string(),
                allowed: allowed.clone(),
            })
        }
    }

    fn timeout_for(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.config.timeout_secs)
            .min(self.config.max_timeout_secs)
    }

    async fn run(&self, instance_id: &str, params: &Value) -> Result<ToolResult, ToolError> {
        self.store.ensure(instance_id).await?;
        let command = required_str(params, "command")?;
        self.check_allowed(command)?;
        let timeout_secs = self.timeout_for(optional_positive(params, "timeout")?);
        let working_dir = self.sandbox.root();

        let request = ExecRequest {
            command,
            working_dir,
            timeout: Duration::from_secs(timeout_secs),
            shell: &self.shell,
        };
        let limits = ExecLimits {
            max_output_length: self.config.max_output_length,
            context_threshold: self.config.context_threshold,
        };

        let output = match exec::run(&request, &limits).await {
            Ok(output) => output,
            Err(e) => {
                debug!(%e, "RunCommandTool::run: command did not complete");
                self.record(
                    instance_id,
                    CommandRecord {
                        command: command.to_string(),
                        success: false,
                        exit_code: None,
                        output_length: 0,
                    },
                )
                .await?;
                return Ok(ToolResult::from_error(&e)
                    .with("command", command)
                    .with("timeout", timeout_secs));
            }
        };

        debug!(exit_code = ?output.exit_code, elapsed = ?output.elapsed, "RunCommandTool::run: command finished");
        let output_length = output.text.len();
        self.record(
            instance_id,
            CommandRecord {
                command: command.to_string(),
                success: output.success,
                exit_code: output.exit_code,
                output_length,
            },
        )
        .await?;

        let reward = if output.success { 1.0 } else { 0.0 };
        Ok(ToolResult::success(output.text, reward)
            .with("command", command)
            .with("timeout", timeout_secs)
            .with("working_directory", working_dir.display().to_string())
            .with("success", output.success)
            .with("exit_code", output.exit_code)
            .with("truncated", output.truncated)
            .with("output_length", output_length))
    }

    async fn record(&self, instance_id: &str, record: CommandRecord) -> Result<(), ToolError> {
        self.store.with(instance_id, |history| history.records.push(record)).await
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn create(&self, instance_id: Option<InstanceId>) -> (InstanceId, ToolResult) {
        let id = self.store.create(instance_id, CommandHistory::default).await;
        let text = format!("bash tool ready. Working directory: {}", self.sandbox.root().display());
        (id, ToolResult::success(text, 0.0))
    }

    async fn execute(&self, instance_id: &str, params: &Value) -> ToolResult {
        debug!(%instance_id, ?params, "RunCommandTool::execute: called");
        self.run(instance_id, params)
            .await
            .unwrap_or_else(|e| ToolResult::from_error(&e))
    }

    async fn calc_reward(&self, instance_id: &str) -> Result<f64, ToolError> {
        self.store.with(instance_id, |history| history.success_rate()).await
    }

    async fn release(&self, instance_id: &str) -> Result<(), ToolError> {
        let history = self.store.release(instance_id).await?;
        let last = history.records.last().map(|r| r.command.as_str()).unwrap_or("");
        debug!(
            %instance_id,
            successes = history.successes(),
            commands = history.records.len(),
            output_bytes = history.total_output(),
            failed_exit_codes = ?history.failed_exit_codes(),
            %last,
            "RunCommandTool::release: commands successful"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn tool_in(dir: &std::path::Path, config: BashConfig) -> RunCommandTool {
        let config = BashConfig {
            shell: PathBuf::from("/bin/sh"),
            ..config
        };
        RunCommandTool::new(Sandbox::new(dir).unwrap(), config)
    }

    #[tokio::test]
    async fn test_run_command_basic() {
        let temp = tempdir().unwrap();
        let tool = tool_in(temp.path(), BashConfig::default());
        let (id, ready) = tool.create(None).await;
        assert!(ready.text.starts_with("bash tool ready. Working directory:"));

        let result = tool.execute(&id, &json!({"command": "echo hello"})).await;

        assert!(!result.is_error());
        assert_eq!(result.reward, 1.0);
        assert!(result.text.starts_with("hello"));
        assert_eq!(result.metadata["success"], true);
        assert_eq!(result.metadata["exit_code"], 0);
        assert_eq!(result.metadata["timeout"], 30);
    }

    #[tokio::test]
    async fn test_run_command_failure_is_not_an_error_kind() {
        let temp = tempdir().unwrap();
        let tool = tool_in(temp.path(), BashConfig::default());
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({"command": "false"})).await;

        assert!(!result.is_error());
        assert_eq!(result.reward, 0.0);
        assert_eq!(result.metadata["success"], false);
        assert!(result.text.contains("exit code 1"));
    }

    #[tokio::test]
    async fn test_run_command_missing_command() {
        let temp = tempdir().unwrap();
        let tool = tool_in(temp.path(), BashConfig::default());
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({})).await;

        assert_eq!(result.error_kind(), Some("invalid_argument"));
        assert!(result.text.contains("command is required"));
    }

    #[tokio::test]
    async fn test_run_command_unknown_instance() {
        let temp = tempdir().unwrap();
        let tool = tool_in(temp.path(), BashConfig::default());

        let result = tool.execute("nope", &json!({"command": "touch created.txt"})).await;

        assert_eq!(result.error_kind(), Some("not_found"));
        assert!(!temp.path().join("created.txt").exists());
    }

    #[tokio::test]
    async fn test_run_command_allow_list() {
        let temp = tempdir().unwrap();
        let config = BashConfig {
            allowed_commands: vec!["echo".to_string(), "ls".to_string()],
            ..Default::default()
        };
        let tool = tool_in(temp.path(), config);
        let (id, _) = tool.create(None).await;

        let ok = tool.execute(&id, &json!({"command": "  echo allowed"})).await;
        assert!(!ok.is_error());

        let denied = tool.execute(&id, &json!({"command": "touch x.txt"})).await;
        assert_eq!(denied.error_kind(), Some("forbidden"));
        assert_eq!(denied.metadata["reason"], "forbidden_command");
        assert!(!temp.path().join("x.txt").exists());

        // Forbidden commands never reach the engine, so history only has the echo
        assert_eq!(tool.calc_reward(&id).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_history_tracks_exit_codes_and_output() {
        let temp = tempdir().unwrap();
        let tool = tool_in(temp.path(), BashConfig::default());
        let (id, _) = tool.create(None).await;

        let ok = tool.execute(&id, &json!({"command": "echo hello"})).await;
        tool.execute(&id, &json!({"command": "exit 3"})).await;
        let ok_len = ok.metadata["output_length"].as_u64().unwrap() as usize;

        let (total, failed) = tool
            .store
            .with(&id, |history| (history.total_output(), history.failed_exit_codes()))
            .await
            .unwrap();
        assert!(total > ok_len);
        assert_eq!(failed, vec![Some(3)]);
        assert_eq!(tool.calc_reward(&id).await.unwrap(), 0.5);
    }

    #[tokio::test]
    async fn test_run_command_timeout() {
        let temp = tempdir().unwrap();
        let tool = tool_in(temp.path(), BashConfig::default());
        let (id, _) = tool.create(None).await;

        let result = tool.execute(&id, &json!({"command": "sleep 30", "timeout": 1})).await;

        assert_eq!(result.error_kind(), Some("timeout"));
        assert_eq!(result.reward, 0.0);
        assert!(result.text.contains("timed out"));
        assert_eq!(tool.calc_reward(&id).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_timeout_is_clamped() {
        let temp = tempdir().unwrap();
        let config = BashConfig {
            timeout_secs: 5,
            max_timeout_secs: 10,
            ..Default::default()
        };
        let tool = tool_in(temp.path(), config);

        assert_eq!(tool.timeout_for(None), 5);
        assert_eq!(tool.timeout_for(Some(3)), 3);
        assert_eq!(tool.timeout_for(Some(9999)), 10);
    }

    #[tokio::test]
    async fn test_calc_reward_is_success_rate() {
        let temp = tempdir().unwrap();
        let tool = tool_in(temp.path(), BashConfig::default());
        let (id, _) = tool.create(Some("traj".to_string())).await;

        assert_eq!(tool.calc_reward(&id).await.unwrap(), 0.0);
        tool.execute(&id, &json!({"command": "true"})).await;
        tool.execute(&id, &json!({"command": "false"})).await;
        tool.execute(&id, &json!({"command": "true"})).await;
        tool.execute(&id, &json!({"command": "true"})).await;

        assert_eq!(tool.calc_reward(&id).await.unwrap(), 0.75);
    }

    #[tokio::test]
    async fn test_release_twice() {
        let temp = tempdir().unwrap();
        let tool = tool_in(temp.path(), BashConfig::default());
        let (id, _) = tool.create(None).await;

        assert!(tool.release(&id).await.is_ok());
        assert!(matches!(tool.release(&id).await, Err(ToolError::UnknownInstance { .. })));
        assert!(tool.calc_reward(&id).await.is_err());
    }
}
