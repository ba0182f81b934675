//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "taskloom")]
#[command(about = "Taskloom - dependency-aware task orchestrator", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .taskloom/
    #[arg(short, long, global = true, env = "TASKLOOM_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decompose a task, run its subtasks and print the report
    Run {
        /// Task description
        description: String,

        /// Treat the task as resource intensive (uses batch concurrency)
        #[arg(short, long)]
        batch: bool,

        /// Use network-free collaborators
        #[arg(long)]
        offline: bool,
    },

    /// List persisted tasks
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of tasks to display
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show details for a specific task
    Show {
        /// Task ID or unique prefix
        task_id: String,
    },

    /// Preview classification and grouping without executing anything
    Plan {
        /// Task description
        description: String,
    },

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
}
