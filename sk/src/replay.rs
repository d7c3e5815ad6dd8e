//! Replay scripts - JSON-lines sequences of tool calls

use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

/// One scripted tool call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayStep {
    pub tool: String,
    #[serde(default = "empty_params")]
    pub params: Value,
}

fn empty_params() -> Value {
    Value::Object(Map::new())
}

/// Parse a script; blank lines and lines starting with `#` are skipped
pub fn parse_script(text: &str) -> Result<Vec<ReplayStep>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(n, line)| {
            serde_json::from_str::<ReplayStep>(line).context(format!("Invalid replay step on line {}", n + 1))
        })
        .collect()
}
