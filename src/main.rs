//! Taskloom CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use taskloom::cli::commands::{config as config_cmd, list, plan, run, show};
use taskloom::cli::{handle_error, Cli, Commands, ConfigCommands};
use taskloom::domain::models::Config;
use taskloom::infrastructure::config::ConfigLoader;
use taskloom::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = execute(&cli).await {
        handle_error(err, cli.json);
    }
}

async fn execute(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let log_config = LogConfig::try_from(&config.logging)?;
    let _logger = LoggerImpl::init(&log_config).context("Failed to initialize logging")?;

    match &cli.command {
        Commands::Run {
            description,
            batch,
            offline,
        } => run::handle_run(&config, description.clone(), *batch, *offline, cli.json).await,
        Commands::List { status, limit } => {
            list::handle_list(&config, status.clone(), *limit, cli.json).await
        }
        Commands::Show { task_id } => show::handle_show(&config, task_id, cli.json).await,
        Commands::Plan { description } => plan::handle_plan(&config, description, cli.json),
        Commands::Config(ConfigCommands::Show) => config_cmd::handle_show(&config, cli.json),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}
