//! Tool trait definition

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::ToolError;
use super::descriptor::ToolDescriptor;

/// Opaque identifier of one tool instance
pub type InstanceId = String;

/// A stateful tool driven by one trajectory per instance
///
/// Every `execute` call is total: failures come back as a `ToolResult`
/// carrying `metadata.error`, never as a panic or `Err`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static capability descriptor
    fn descriptor(&self) -> &ToolDescriptor;

    /// Tool name (matches the function-call name)
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Create (or reuse) an instance, returning its id and a readiness message
    async fn create(&self, instance_id: Option<InstanceId>) -> (InstanceId, ToolResult);

    /// Execute the tool against an existing instance
    async fn execute(&self, instance_id: &str, params: &Value) -> ToolResult;

    /// Aggregate reward derived from the instance's recorded history
    async fn calc_reward(&self, instance_id: &str) -> Result<f64, ToolError>;

    /// Drop the instance record
    async fn release(&self, instance_id: &str) -> Result<(), ToolError>;
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub text: String,
    pub reward: f64,
    pub metadata: Map<String, Value>,
}

impl ToolResult {
    /// Create a successful result with the given reward
    pub fn success(text: impl Into<String>, reward: f64) -> Self {
        debug!(reward, "ToolResult::success: called");
        Self {
            text: text.into(),
            reward,
            metadata: Map::new(),
        }
    }

    /// Convert a failure into a zero-reward result tagged with its kind
    pub fn from_error(err: &ToolError) -> Self {
        debug!(kind = %err.kind(), "ToolResult::from_error: called");
        let mut metadata = Map::new();
        metadata.insert("error".to_string(), Value::from(err.kind().as_str()));
        metadata.insert("reason".to_string(), Value::from(err.reason()));
        Self {
            text: format!("Error: {}", err),
            reward: 0.0,
            metadata,
        }
    }

    /// Attach one metadata entry
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.metadata.contains_key("error")
    }

    /// The `metadata.error` kind string, if this is an error result
    pub fn error_kind(&self) -> Option<&str> {
        self.metadata.get("error").and_then(Value::as_str)
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        Self::from_error(&err)
    }
}
