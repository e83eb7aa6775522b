//! Command-line interface.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Parser, Debug)]
#[command(name = "provost")]
#[command(about = "Provost - intent routing and agent orchestration for district data", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .provost/
    #[arg(short, long, global = true, env = "PROVOST_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve(commands::serve::ServeArgs),

    /// Classify a message with the rule engine
    Classify(commands::classify::ClassifyArgs),

    /// List registered agents
    Agents,

    /// List the loaded rule catalog
    Rules,

    /// Reload retrieval indexes from disk
    Reindex,
}

impl Commands {
    /// Long-running commands log at the configured level; one-shot commands
    /// stay quiet unless `RUST_LOG` says otherwise.
    pub const fn is_long_running(&self) -> bool {
        matches!(self, Self::Serve(_))
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Classify(args) => commands::classify::execute(args, &config, cli.json),
        Commands::Agents => commands::agents::execute(&config, cli.json),
        Commands::Rules => commands::rules::execute(&config, cli.json),
        Commands::Reindex => commands::reindex::execute(&config, cli.json).await,
    }
}

/// Print an error the way the selected output mode expects, then exit 1.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{body}");
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
