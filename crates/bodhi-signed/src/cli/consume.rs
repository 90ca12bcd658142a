use std::path::Path;

use anyhow::{Context, Result};
use bodhi_signed_core::{Config, Consumer};
use tokio::io::{AsyncBufRead, BufReader};

pub async fn run(config: &Config, input: Option<&Path>) -> Result<()> {
    match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            consume(config, BufReader::new(file)).await
        }
        None => consume(config, BufReader::new(tokio::io::stdin())).await,
    }
}

async fn consume<R>(config: &Config, reader: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let (storage, handler) = super::open_handler(config).await?;
    let consumer = Consumer::from_config(handler, config);

    tracing::info!(topic = %config.topic, policy = %config.failure_policy, "Consuming messages");
    let result = consumer.consume(reader).await;
    storage.close().await;

    let stats = result?;
    tracing::info!(%stats, "Input exhausted");
    println!("{stats}");
    Ok(())
}
