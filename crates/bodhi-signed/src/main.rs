mod cli;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};

const DEFAULT_LOG_FILTER: &str = "bodhi_signed=info,bodhi_signed_core=info";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;

    match cli.command {
        Commands::Consume { input } => cli::consume::run(&config, input.as_deref()).await,
        Commands::Handle { file } => cli::handle::run(&config, &file).await,
        Commands::Init => cli::init::run(&config).await,
    }
}
