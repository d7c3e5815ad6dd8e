//! ToolRegistry - owns the tool set and dispatches calls by tool name

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;

use super::builtin::{EditFileTool, ReadFileTool, RunCommandTool, TodoTool};
use super::{InstanceId, Sandbox, Tool, ToolDescriptor, ToolError, ToolResult};

/// Tools available to a trajectory driver, keyed by name
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create the registry with the four standard tools sharing one sandbox
    pub fn standard(config: &Config) -> Result<Self, ToolError> {
        let sandbox = Sandbox::new(&config.sandbox_root)?;
        debug!(root = ?sandbox.root(), "ToolRegistry::standard: sandbox ready");

        let mut registry = Self::empty();
        registry.add_tool(Arc::new(RunCommandTool::new(sandbox.clone(), config.bash.clone())));
        registry.add_tool(Arc::new(ReadFileTool::new(sandbox.clone(), config.read_file.clone())));
        registry.add_tool(Arc::new(EditFileTool::new(sandbox, config.edit_file.clone())));
        registry.add_tool(Arc::new(TodoTool::new(config.todo.clone())));
        Ok(registry)
    }

    /// Create an empty registry (for testing)
    pub fn empty() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Add a tool, replacing any tool with the same name
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Descriptors of every tool, sorted by name
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        let mut descriptors: Vec<&ToolDescriptor> = self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Get tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    fn lookup(&self, name: &str) -> Result<&Arc<dyn Tool>, ToolError> {
        self.tools.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })
    }

    pub async fn create(
        &self,
        tool: &str,
        instance_id: Option<InstanceId>,
    ) -> Result<(InstanceId, ToolResult), ToolError> {
        Ok(self.lookup(tool)?.create(instance_id).await)
    }

    /// Execute a tool call; an unknown tool becomes an error result
    pub async fn execute(&self, tool: &str, instance_id: &str, params: &Value) -> ToolResult {
        debug!(%tool, %instance_id, "ToolRegistry::execute: called");
        match self.lookup(tool) {
            Ok(t) => t.execute(instance_id, params).await,
            Err(e) => ToolResult::from_error(&e),
        }
    }

    pub async fn calc_reward(&self, tool: &str, instance_id: &str) -> Result<f64, ToolError> {
        self.lookup(tool)?.calc_reward(instance_id).await
    }

    pub async fn release(&self, tool: &str, instance_id: &str) -> Result<(), ToolError> {
        self.lookup(tool)?.release(instance_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config {
            sandbox_root: dir.to_path_buf(),
            ..Default::default()
        };
        config.bash.shell = "/bin/sh".into();
        config
    }

    #[test]
    fn test_standard_tools() {
        let temp = tempdir().unwrap();
        let registry = ToolRegistry::standard(&config_in(temp.path())).unwrap();

        assert_eq!(
            registry.tool_names(),
            vec!["bash", "edit_file", "read_file", "todo_manager"]
        );
        assert!(registry.has_tool("read_file"));
        assert!(!registry.has_tool("write_file"));
        assert_eq!(registry.descriptors()[0].name, "bash");
    }

    #[test]
    fn test_standard_rejects_missing_root() {
        let temp = tempdir().unwrap();
        let result = ToolRegistry::standard(&config_in(&temp.path().join("missing")));
        assert!(matches!(result, Err(ToolError::InvalidSandboxRoot { .. })));
    }

    #[tokio::test]
    async fn test_dispatch_by_name() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("hello.txt"), "hi").unwrap();
        let registry = ToolRegistry::standard(&config_in(temp.path())).unwrap();

        let (id, _) = registry.create("read_file", None).await.unwrap();
        let result = registry.execute("read_file", &id, &json!({"filepath": "hello.txt"})).await;
        assert!(!result.is_error());
        assert_eq!(registry.calc_reward("read_file", &id).await.unwrap(), 1.0);
        registry.release("read_file", &id).await.unwrap();
        assert!(registry.calc_reward("read_file", &id).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::empty();

        let result = registry.execute("nope", "id", &json!({})).await;
        assert_eq!(result.error_kind(), Some("not_found"));
        assert_eq!(result.metadata["reason"], "tool_not_found");
        assert!(registry.create("nope", None).await.is_err());
    }

    #[tokio::test]
    async fn test_same_id_across_tools_is_disjoint() {
        let temp = tempdir().unwrap();
        let registry = ToolRegistry::standard(&config_in(temp.path())).unwrap();

        registry.create("todo_manager", Some("traj".into())).await.unwrap();
        registry.create("bash", Some("traj".into())).await.unwrap();
        registry.release("bash", "traj").await.unwrap();

        let result = registry
            .execute("todo_manager", "traj", &json!({"action": "list"}))
            .await;
        assert!(!result.is_error());
    }
}
