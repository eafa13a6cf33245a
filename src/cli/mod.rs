//! Command-line interface.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::agent::AgentArgs;
use commands::init::InitArgs;
use commands::knowledge::KnowledgeArgs;
use commands::tool::ToolArgs;

#[derive(Parser, Debug)]
#[command(name = "genagent")]
#[command(about = "genagent - configurable agents with knowledge-base retrieval", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .genagent/config.yaml)
    #[arg(short, long, global = true, env = "GENAGENT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .genagent/ with a default configuration and catalog
    Init(InitArgs),

    /// Knowledge base management
    Knowledge(KnowledgeArgs),

    /// Agent management and queries
    Agent(AgentArgs),

    /// Tool catalog management
    Tool(ToolArgs),
}

/// Print an error and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
