//! Capability descriptors - static metadata describing a tool's parameters

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
}

/// One named parameter of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

/// Immutable description of a tool: name, purpose and parameter schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, ParamSpec>,
    pub required: Vec<String>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Add an optional parameter
    pub fn param(mut self, name: &str, kind: ParamType, description: &str) -> Self {
        self.parameters.insert(
            name.to_string(),
            ParamSpec {
                kind,
                description: description.to_string(),
                allowed: None,
            },
        );
        self
    }

    /// Add a required parameter
    pub fn required_param(mut self, name: &str, kind: ParamType, description: &str) -> Self {
        self.required.push(name.to_string());
        self.param(name, kind, description)
    }

    /// Add a string parameter restricted to the given values
    pub fn enum_param(mut self, name: &str, description: &str, values: &[&str], required: bool) -> Self {
        if required {
            self.required.push(name.to_string());
        }
        self.parameters.insert(
            name.to_string(),
            ParamSpec {
                kind: ParamType::String,
                description: description.to_string(),
                allowed: Some(values.iter().map(|v| v.to_string()).collect()),
            },
        );
        self
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// JSON Schema for input parameters
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|(name, spec)| {
                let mut prop = json!({
                    "type": spec.kind,
                    "description": spec.description,
                });
                if let Some(values) = &spec.allowed {
                    prop["enum"] = json!(values);
                }
                (name.clone(), prop)
            })
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }

    /// Function-calling envelope around the input schema
    pub fn function_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema(),
                "strict": false,
            }
        })
    }
}
