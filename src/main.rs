//! genagent CLI entry point.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use genagent::cli::commands::{agent, init, knowledge, tool};
use genagent::cli::{handle_error, Cli, Commands};
use genagent::infrastructure::config::ConfigLoader;
use genagent::infrastructure::logging::{LogConfig, LoggerImpl};
use genagent::infrastructure::AppContext;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli.command, cli.config, cli.json).await {
        handle_error(err, cli.json);
    }
}

async fn run(command: Commands, config_path: Option<PathBuf>, json_mode: bool) -> Result<()> {
    match command {
        Commands::Init(args) => init::execute(args, json_mode),
        Commands::Knowledge(args) => {
            let (_logger, context) = bootstrap(config_path).await?;
            knowledge::execute(args, &context, json_mode).await
        }
        Commands::Agent(args) => {
            let (_logger, context) = bootstrap(config_path).await?;
            agent::execute(args, &context, json_mode).await
        }
        Commands::Tool(args) => {
            let (_logger, context) = bootstrap(config_path).await?;
            tool::execute(args, &context, json_mode).await
        }
    }
}

/// Load configuration, start logging and wire the services.
async fn bootstrap(config_path: Option<PathBuf>) -> Result<(LoggerImpl, AppContext)> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;
    let context = AppContext::build(config).await?;
    Ok((logger, context))
}
