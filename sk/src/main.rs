//! Sandkit - sandboxed tool runtime
//!
//! CLI entry point for inspecting tool schemas and driving tool calls.

use std::collections::HashMap;
use std::fs;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use serde_json::{Value, json};
use tracing::{debug, info};

use sandkit::cli::{Cli, Command};
use sandkit::config::Config;
use sandkit::replay::parse_script;
use sandkit::tools::{InstanceId, ToolRegistry, ToolResult};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install subscriber: {}", e))?;

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(root) = cli.root {
        config.sandbox_root = root;
    }
    config.validate().context("Invalid configuration")?;

    let registry = ToolRegistry::standard(&config).context("Failed to build tool registry")?;
    info!(root = %config.sandbox_root.display(), "sandkit ready");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Schema { tool } => cmd_schema(&registry, tool.as_deref()),
        Command::Exec {
            tool,
            params,
            instance,
            json,
        } => cmd_exec(&registry, &tool, &params, instance, json).await,
        Command::Replay { file } => cmd_replay(&registry, &file).await,
    }
}

fn cmd_schema(registry: &ToolRegistry, tool: Option<&str>) -> Result<()> {
    let schemas: Vec<Value> = match tool {
        Some(name) => {
            let tool = registry
                .get(name)
                .ok_or_else(|| eyre::eyre!("Unknown tool: {}", name))?;
            vec![tool.descriptor().function_schema()]
        }
        None => registry.descriptors().iter().map(|d| d.function_schema()).collect(),
    };

    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}

async fn cmd_exec(
    registry: &ToolRegistry,
    tool: &str,
    params: &str,
    instance: Option<InstanceId>,
    as_json: bool,
) -> Result<()> {
    let params: Value = serde_json::from_str(params).context("--params must be a JSON object")?;
    let (id, _) = registry.create(tool, instance).await?;

    let result = registry.execute(tool, &id, &params).await;
    let instance_reward = registry.calc_reward(tool, &id).await?;
    registry.release(tool, &id).await?;

    if as_json {
        let out = json!({
            "tool": tool,
            "instance_id": id,
            "result": result,
            "instance_reward": instance_reward,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", result.text);
        print_status(tool, &result);
        println!("  instance reward: {:.2}", instance_reward);
    }

    match result.error_kind() {
        Some(kind) => Err(eyre::eyre!("{} failed ({})", tool, kind)),
        None => Ok(()),
    }
}

async fn cmd_replay(registry: &ToolRegistry, file: &std::path::Path) -> Result<()> {
    let script = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
    let steps = parse_script(&script)?;
    info!(steps = steps.len(), "Replaying script");

    let mut instances: HashMap<String, InstanceId> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for (n, step) in steps.iter().enumerate() {
        println!("{} {} {}", format!("[{}]", n + 1).dimmed(), step.tool.cyan(), step.params);

        let id = match instances.get(&step.tool) {
            Some(id) => id.clone(),
            None if registry.has_tool(&step.tool) => {
                let (id, _) = registry.create(&step.tool, None).await?;
                instances.insert(step.tool.clone(), id.clone());
                order.push(step.tool.clone());
                id
            }
            None => String::new(),
        };

        let result = registry.execute(&step.tool, &id, &step.params).await;
        println!("{}", result.text);
        print_status(&step.tool, &result);
    }

    println!();
    println!("{}", "Rewards:".bold());
    for tool in &order {
        let id = &instances[tool];
        let reward = registry.calc_reward(tool, id).await?;
        println!("  {:<14} {:.2}", tool, reward);
        registry.release(tool, id).await?;
    }
    Ok(())
}

fn print_status(tool: &str, result: &ToolResult) {
    match result.error_kind() {
        Some(kind) => println!("{} {} {} (reward {:.2})", "✗".red(), tool, kind.red(), result.reward),
        None => println!("{} {} (reward {:.2})", "✓".green(), tool, result.reward),
    }
}
