//! CLI argument parsing for sandkit

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sk")]
#[command(author, version, about = "Sandboxed tool runtime for agent trajectories", long_about = None)]
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

    /// Sandbox root (overrides sandbox-root from the config file)
    #[arg(short = 'r', long = "root", global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print function-calling schemas for the tools
    Schema {
        /// Only print the schema of this tool
        #[arg(short, long)]
        tool: Option<String>,
    },

    /// Run a single tool call: create, execute, reward, release
    Exec {
        /// Tool name (bash, read_file, edit_file, todo_manager)
        #[arg(required = true)]
        tool: String,

        /// Tool parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Instance id to use instead of a generated one
        #[arg(short, long)]
        instance: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a JSON-lines script of tool calls against one instance per tool
    Replay {
        /// Script file; each line is {"tool": .., "params": {..}}
        #[arg(required = true)]
        file: PathBuf,
    },
}
