//! CLI argument parsing for turnjudge

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tj")]
#[command(author, version, about = "Judge multi-turn repository exploration transcripts", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Feed a transcript to a session one assistant turn at a time
    Judge {
        /// JSON transcript: a message array or {"messages": [..], "ground_truth": ".."}
        #[arg(required = true)]
        transcript: PathBuf,

        /// Rubric category (overrides ground_truth in the transcript)
        #[arg(short, long)]
        ground_truth: Option<String>,

        /// Print each turn outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score a complete solution text
    Reward {
        /// Solution text file, or a JSON-lines file of samples with --batch
        #[arg(required = true)]
        file: PathBuf,

        /// Rubric category used for analysis quality
        #[arg(short, long)]
        ground_truth: Option<String>,

        /// Use the quick keyword-and-length heuristic instead of the full score
        #[arg(long, conflicts_with_all = ["ground_truth", "batch"])]
        simple: bool,

        /// Score each {"solution_str", "ground_truth"} line of FILE
        #[arg(long)]
        batch: bool,
    },

    /// Print the active rubric set as YAML
    Rubrics,
}
