//! `provost serve`: run the HTTP API until interrupted.

use anyhow::Result;
use clap::Args;

use crate::adapters::http::ApiServer;
use crate::application::AppContext;
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the configured bind host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the configured port
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn execute(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let context = AppContext::build(config).await?;
    let server = ApiServer::new(context.config.server.clone(), context.orchestrator.clone());
    server.serve_with_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
    }
}
