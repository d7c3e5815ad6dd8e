//! Turnjudge - transcript judging CLI

use std::fs;
use std::path::Path;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use turnjudge::cli::{Cli, Command};
use turnjudge::config::Config;
use turnjudge::reward::{RewardSample, score_batch, score_solution};
use turnjudge::{ChatMessage, Interaction, Role, exploration_reward};

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

/// Accepted transcript shapes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Transcript {
    Messages(Vec<ChatMessage>),
    Labeled {
        messages: Vec<ChatMessage>,
        #[serde(default)]
        ground_truth: Option<String>,
    },
}

impl Transcript {
    fn into_parts(self) -> (Vec<ChatMessage>, Option<String>) {
        match self {
            Self::Messages(messages) => (messages, None),
            Self::Labeled { messages, ground_truth } => (messages, ground_truth),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Command::Judge {
            transcript,
            ground_truth,
            json,
        } => cmd_judge(&config, &transcript, ground_truth, json).await,
        Command::Reward {
            file,
            ground_truth,
            simple,
            batch,
        } => cmd_reward(&config, &file, ground_truth.as_deref(), simple, batch),
        Command::Rubrics => cmd_rubrics(&config),
    }
}

async fn cmd_judge(config: &Config, path: &Path, ground_truth: Option<String>, as_json: bool) -> Result<()> {
    let content = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    let transcript: Transcript = serde_json::from_str(&content).context("Failed to parse transcript")?;
    let (messages, label) = transcript.into_parts();
    let ground_truth = ground_truth.or(label);

    let judge = Interaction::from_config(config)?;
    let id = judge.start_interaction(None, ground_truth.clone()).await;
    info!(%id, messages = messages.len(), ?ground_truth, "Judging transcript");

    let turn_ends: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role == Role::Assistant)
        .map(|(i, _)| i + 1)
        .collect();

    let mut final_score = 0.0;
    for (turn, end) in turn_ends.iter().enumerate() {
        let outcome = judge.generate_response(&id, &messages[..*end]).await;
        final_score = outcome.score;

        if as_json {
            println!("{}", json!({ "turn": turn + 1, "outcome": outcome }));
        } else {
            let marker = if outcome.terminate { "■".yellow() } else { "▶".cyan() };
            println!(
                "{} {} score {:.2}",
                marker,
                format!("Turn {}", turn + 1).bold(),
                outcome.score
            );
            for line in outcome.feedback.lines() {
                println!("  {}", line.dimmed());
            }
        }

        if outcome.terminate {
            break;
        }
    }

    if turn_ends.is_empty() {
        println!("{}", "No assistant messages in transcript".yellow());
    }

    let session = judge.finalize_interaction(&id).await;
    if !as_json {
        let turns = session.map(|s| s.turn_count).unwrap_or(0);
        println!("{} final score {:.2} after {} turn(s)", "✓".green(), final_score, turns);
    }
    Ok(())
}

fn cmd_reward(config: &Config, path: &Path, ground_truth: Option<&str>, simple: bool, batch: bool) -> Result<()> {
    let content = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    if simple {
        println!("{:.2}", exploration_reward(&content));
        return Ok(());
    }

    let policy = config.policy()?;
    if batch {
        let samples = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str::<RewardSample>(line).context(format!("Invalid sample on line {}", n + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        info!(samples = samples.len(), "Scoring batch");
        for score in score_batch(&samples, &policy) {
            println!("{:.3}", score);
        }
        return Ok(());
    }

    let breakdown = score_solution(&content, ground_truth, &policy);
    println!("{:.2}", breakdown.total);
    for (label, value) in [
        ("tool usage", breakdown.tool_usage),
        ("analysis", breakdown.analysis_quality),
        ("completeness", breakdown.completeness),
        ("methodology", breakdown.methodology),
        ("bonus", breakdown.bonus),
    ] {
        println!("  {:<14} {}", label, format!("{:.2}", value).dimmed());
    }
    Ok(())
}

fn cmd_rubrics(config: &Config) -> Result<()> {
    let policy = config.policy()?;
    print!("{}", serde_yaml::to_string(policy.rubric_set())?);
    Ok(())
}
