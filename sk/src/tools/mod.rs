//! Tool system for agent trajectories
//!
//! Every tool implements [`Tool`] and owns an [`InstanceStore`] mapping
//! instance ids to private state. File tools resolve paths through a shared
//! [`Sandbox`]; the command runner executes under its root.

mod descriptor;
mod error;
mod registry;
mod sandbox;
mod store;
mod traits;

pub mod builtin;
pub mod exec;
pub mod ledger;
pub mod params;

pub use descriptor::{ParamSpec, ParamType, ToolDescriptor};
pub use error::{ErrorKind, ToolError};
pub use registry::ToolRegistry;
pub use sandbox::Sandbox;
pub use store::InstanceStore;
pub use traits::{InstanceId, Tool, ToolResult};
