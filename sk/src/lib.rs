//! Sandkit - sandboxed, stateful tools for agent trajectories
//!
//! A trajectory driver creates one instance per tool, calls `execute` with
//! tool-specific JSON parameters and receives a text/reward/metadata result.
//! Every `execute` is total: failures come back as results tagged with an
//! error kind, never as panics.
//!
//! # Modules
//!
//! - [`tools`] - Tool trait, instance stores, sandbox, execution engine and the builtin tools
//! - [`config`] - Configuration types and loading
//! - [`replay`] - JSON-lines scripts of tool calls
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use sandkit::config::Config;
//! use sandkit::tools::ToolRegistry;
//!
//! let registry = ToolRegistry::standard(&Config::default())?;
//! let (id, _) = registry.create("bash", None).await?;
//! let result = registry.execute("bash", &id, &serde_json::json!({"command": "ls"})).await;
//! ```

pub mod cli;
pub mod config;
pub mod replay;
pub mod tools;

pub use config::Config;
pub use tools::{ErrorKind, InstanceId, Tool, ToolDescriptor, ToolError, ToolRegistry, ToolResult};
