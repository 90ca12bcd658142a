pub mod consume;
pub mod handle;
pub mod init;

use std::path::PathBuf;

use anyhow::Result;
use bodhi_signed_core::{Config, FailurePolicy, SignedHandler, Storage};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bodhi-signed",
    about = "Mark builds as signed when they reach their release's pending-testing tag",
    version
)]
pub struct Cli {
    /// Database URL (overrides BODHI_DATABASE_URL)
    #[arg(long, global = true)]
    pub database: Option<String>,
    /// Topic to handle (overrides BODHI_SIGNED_TOPIC)
    #[arg(long, global = true)]
    pub topic: Option<String>,
    /// Append failed messages to this file instead of aborting
    #[arg(long = "dead-letter", global = true)]
    pub dead_letter: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Handle newline-delimited JSON messages from a file or stdin
    Consume {
        /// Read messages from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Handle a single JSON message
    Handle {
        /// File containing the message
        file: PathBuf,
    },
    /// Create the database schema
    Init,
}

impl Cli {
    /// Environment configuration with command line overrides applied.
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::from_env()?;

        if let Some(url) = &self.database {
            config.database_url.clone_from(url);
        }
        if let Some(topic) = &self.topic {
            config.topic.clone_from(topic);
        }
        if let Some(path) = &self.dead_letter {
            config.failure_policy = FailurePolicy::DeadLetter;
            config.dead_letter_path = Some(path.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

async fn open_storage(config: &Config) -> Result<Storage> {
    tracing::debug!(url = %config.database_url, "Opening database");
    Ok(Storage::open(&config.database_url, config.max_connections).await?)
}

pub(crate) async fn open_handler(config: &Config) -> Result<(Storage, SignedHandler)> {
    let storage = open_storage(config).await?;
    let handler = SignedHandler::new(storage.clone());
    Ok((storage, handler))
}
