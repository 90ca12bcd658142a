use anyhow::Result;
use bodhi_signed_core::Config;

pub async fn run(config: &Config) -> Result<()> {
    let storage = super::open_storage(config).await?;
    storage.close().await;

    println!("Initialized database at {}", config.database_url);
    Ok(())
}
