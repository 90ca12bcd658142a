use std::path::Path;

use anyhow::{Context, Result};
use bodhi_signed_core::{Config, Message, MessageHandler, Outcome};

pub async fn run(config: &Config, file: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let message = Message::from_json(&raw)?;

    if message.topic != config.topic {
        println!("ignored: topic {} is not {}", message.topic, config.topic);
        return Ok(());
    }

    let (storage, handler) = super::open_handler(config).await?;
    let outcome = handler.handle(&message).await;
    storage.close().await;

    match outcome {
        Outcome::Failed(e) => Err(e.into()),
        outcome => {
            println!("{outcome}");
            Ok(())
        }
    }
}
