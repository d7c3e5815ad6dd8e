//! Sandkit configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound for any command timeout (one day)
pub const TIMEOUT_CEILING_SECS: u64 = 24 * 60 * 60;

/// Main sandkit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log level (overridden by --log-level)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Directory every file tool and command is confined to
    #[serde(rename = "sandbox-root")]
    pub sandbox_root: PathBuf,

    /// Command runner limits
    pub bash: BashConfig,

    /// File reader limits
    #[serde(rename = "read-file")]
    pub read_file: ReadFileConfig,

    /// File editor limits
    #[serde(rename = "edit-file")]
    pub edit_file: EditFileConfig,

    /// Todo ledger limits
    pub todo: TodoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            sandbox_root: PathBuf::from("."),
            bash: BashConfig::default(),
            read_file: ReadFileConfig::default(),
            edit_file: EditFileConfig::default(),
            todo: TodoConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if !self.sandbox_root.is_dir() {
            return Err(eyre::eyre!(
                "sandbox-root does not exist or is not a directory: {}",
                self.sandbox_root.display()
            ));
        }
        if self.bash.timeout_secs == 0 {
            return Err(eyre::eyre!("bash.timeout-secs must be greater than zero"));
        }
        if self.bash.max_timeout_secs > TIMEOUT_CEILING_SECS {
            return Err(eyre::eyre!(
                "bash.max-timeout-secs ({}) exceeds the ceiling of {} seconds",
                self.bash.max_timeout_secs,
                TIMEOUT_CEILING_SECS
            ));
        }
        if self.bash.max_timeout_secs < self.bash.timeout_secs {
            return Err(eyre::eyre!(
                "bash.max-timeout-secs ({}) is below bash.timeout-secs ({})",
                self.bash.max_timeout_secs,
                self.bash.timeout_secs
            ));
        }
        if self.bash.context_threshold > self.bash.max_output_length {
            return Err(eyre::eyre!("bash.context-threshold must not exceed bash.max-output-length"));
        }
        if self.read_file.max_lines == 0 {
            return Err(eyre::eyre!("read-file.max-lines must be greater than zero"));
        }
        if self.todo.max_items == 0 {
            return Err(eyre::eyre!("todo.max-items must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .sandkit.yml
        let local_config = PathBuf::from(".sandkit.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/sandkit/sandkit.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sandkit").join("sandkit.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = config_path.cloned().unwrap_or_else(|| PathBuf::from(".sandkit.yml"));
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Command runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BashConfig {
    /// Timeout used when the caller supplies none
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Caller-supplied timeouts are clamped to this
    #[serde(rename = "max-timeout-secs")]
    pub max_timeout_secs: u64,

    /// Output longer than this is truncated
    #[serde(rename = "max-output-length")]
    pub max_output_length: usize,

    /// Working-directory suffix is added only to outputs shorter than this
    #[serde(rename = "context-threshold")]
    pub context_threshold: usize,

    /// Command prefixes that may run; empty allows everything
    #[serde(rename = "allowed-commands")]
    pub allowed_commands: Vec<String>,

    /// Shell used to run commands with `-c`
    pub shell: PathBuf,
}

impl Default for BashConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_timeout_secs: 600,
            max_output_length: 10_000,
            context_threshold: 500,
            allowed_commands: Vec::new(),
            shell: PathBuf::from("/bin/bash"),
        }
    }
}

/// File reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadFileConfig {
    /// Larger files are rejected
    #[serde(rename = "max-file-size")]
    pub max_file_size: u64,

    /// Hard cap on lines returned
    #[serde(rename = "max-lines")]
    pub max_lines: usize,

    /// Readable extensions (".rs" or "rs"); empty allows everything
    #[serde(rename = "allowed-extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for ReadFileConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            max_lines: 10_000,
            allowed_extensions: Vec::new(),
        }
    }
}

/// File editor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditFileConfig {
    /// Larger files are rejected
    #[serde(rename = "max-file-size")]
    pub max_file_size: u64,

    /// Write `<path>.bak` with the pre-edit content before overwriting
    #[serde(rename = "create-backup")]
    pub create_backup: bool,
}

impl Default for EditFileConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            create_backup: true,
        }
    }
}

/// Todo ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoConfig {
    /// Maximum live items per ledger
    #[serde(rename = "max-items")]
    pub max_items: usize,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self { max_items: 100 }
    }
}
