//! Turnjudge configuration

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::policy::{KeywordPolicy, Rubric};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log level (overridden by --log-level)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// A session terminates after this many turns
    #[serde(rename = "max-turns")]
    pub max_turns: u32,

    /// Messages at least this many chars long count as sufficiently detailed
    #[serde(rename = "min-analysis-length")]
    pub min_analysis_length: usize,

    /// Replaces the built-in rubrics; a `generic` entry replaces the fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rubrics: Option<Vec<Rubric>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            max_turns: 5,
            min_analysis_length: 200,
            rubrics: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.max_turns == 0 {
            return Err(crate::error::JudgeError::InvalidMaxTurns.into());
        }
        self.policy().context("Invalid rubrics")?;
        Ok(())
    }

    /// Scoring policy for the configured rubrics
    pub fn policy(&self) -> Result<KeywordPolicy, crate::error::JudgeError> {
        match &self.rubrics {
            Some(rubrics) => KeywordPolicy::new(rubrics.clone()),
            None => Ok(KeywordPolicy::default()),
        }
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .turnjudge.yml
        let local_config = PathBuf::from(".turnjudge.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/turnjudge/turnjudge.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("turnjudge").join("turnjudge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = config_path.cloned().unwrap_or_else(|| PathBuf::from(".turnjudge.yml"));
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_turns, 5);
        assert_eq!(config.min_analysis_length, 200);
        assert!(config.rubrics.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_with_rubrics() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("turnjudge.yml");
        fs::write(
            &path,
            r#"
log-level: debug
max-turns: 3
rubrics:
  - category: perf_analysis
    groups:
      - keywords: [latency, throughput]
        weight: 0.6
      - keywords: [profile]
        weight: 0.4
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_turns, 3);
        assert_eq!(config.min_analysis_length, 200);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("debug"));
        assert!(config.validate().is_ok());

        let policy = config.policy().unwrap();
        assert_eq!(policy.rubric_for(Some("perf_analysis")).groups.len(), 2);
    }

    #[test]
    fn test_validate_rejects_zero_turns() {
        let config = Config {
            max_turns: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_weight() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("turnjudge.yml");
        fs::write(
            &path,
            "rubrics:\n  - category: x\n    groups:\n      - keywords: [a]\n        weight: -1.0\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = tempdir().unwrap();
        assert!(Config::load(Some(&temp.path().join("nope.yml"))).is_err());
    }
}
