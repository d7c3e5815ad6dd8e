//! Tool error types

use std::path::PathBuf;
use thiserror::Error;

/// Coarse failure class reported to callers in `metadata.error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or empty required parameter
    InvalidArgument,
    /// Unknown instance, missing file, missing todo item, absent substring
    NotFound,
    /// Sandbox escape, disallowed command prefix, disallowed extension
    Forbidden,
    /// File or ledger over its configured cap
    ResourceLimit,
    /// Subprocess exceeded its bound
    Timeout,
    /// Undecodable bytes or unexpected I/O failure
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::ResourceLimit => "resource_limit",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during tool execution
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Path {path} escapes sandbox root {root}")]
    SandboxViolation { path: String, root: PathBuf },

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Sandbox root is not a directory: {root}")]
    InvalidSandboxRoot { root: PathBuf },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("String not found in file: {path}")]
    PatternNotFound { path: String },

    #[error("Command not allowed. Allowed commands start with: {allowed:?}")]
    ForbiddenCommand { command: String, allowed: Vec<String> },

    #[error("File type not allowed: {path}. Allowed extensions: {allowed:?}")]
    ForbiddenExtension { path: String, allowed: Vec<String> },

    #[error("File too large ({size} bytes). Maximum allowed: {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Maximum number of todo items ({max}) reached")]
    LedgerFull { max: usize },

    #[error("Command timed out after {timeout_secs:.1} seconds in {working_dir}")]
    CommandTimeout { timeout_secs: f64, working_dir: PathBuf },

    #[error("Failed to execute command in {working_dir}: {source}")]
    Spawn {
        working_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Tool instance not found: {id}. Create it first.")]
    UnknownInstance { id: String },

    #[error("Tool not found: {name}")]
    UnknownTool { name: String },

    #[error("Todo item #{id} not found")]
    UnknownItem { id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unable to decode file (not a text file?): {path}")]
    Decode { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// The taxonomy kind this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::InvalidSandboxRoot { .. } => ErrorKind::InvalidArgument,
            Self::FileNotFound { .. }
            | Self::PatternNotFound { .. }
            | Self::UnknownInstance { .. }
            | Self::UnknownTool { .. }
            | Self::UnknownItem { .. } => ErrorKind::NotFound,
            Self::SandboxViolation { .. }
            | Self::InvalidPath { .. }
            | Self::ForbiddenCommand { .. }
            | Self::ForbiddenExtension { .. } => ErrorKind::Forbidden,
            Self::FileTooLarge { .. } | Self::LedgerFull { .. } => ErrorKind::ResourceLimit,
            Self::CommandTimeout { .. } => ErrorKind::Timeout,
            Self::Spawn { .. } | Self::Decode { .. } | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Fine-grained reason code, reported in `metadata.reason`
    pub fn reason(&self) -> &'static str {
        match self {
            Self::SandboxViolation { .. } => "path_outside_sandbox",
            Self::InvalidPath { .. } => "invalid_path",
            Self::InvalidSandboxRoot { .. } => "invalid_sandbox_root",
            Self::FileNotFound { .. } => "file_not_found",
            Self::PatternNotFound { .. } => "string_not_found",
            Self::ForbiddenCommand { .. } => "forbidden_command",
            Self::ForbiddenExtension { .. } => "forbidden_extension",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::LedgerFull { .. } => "max_items_reached",
            Self::CommandTimeout { .. } => "command_timeout",
            Self::Spawn { .. } => "spawn_failed",
            Self::UnknownInstance { .. } => "instance_not_found",
            Self::UnknownTool { .. } => "tool_not_found",
            Self::UnknownItem { .. } => "item_not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Decode { .. } => "decode_error",
            Self::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => "permission_denied",
            Self::Io(_) => "io_error",
        }
    }

    pub(crate) fn missing(param: &str) -> Self {
        Self::InvalidArgument(format!("{} is required", param))
    }
}
