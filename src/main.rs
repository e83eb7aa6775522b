//! Provost CLI entry point.

use clap::Parser;

use provost::cli::{handle_error, load_config, run, Cli};
use provost::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(&err, json_mode),
    };
    if !cli.command.is_long_running() {
        config.logging.level = "warn".to_string();
    }

    let _logger = match LogConfig::try_from(&config.logging).and_then(|c| LoggerImpl::init(&c)) {
        Ok(logger) => logger,
        Err(err) => handle_error(&err, json_mode),
    };

    if let Err(err) = run(cli, config).await {
        handle_error(&err, json_mode);
    }
}
