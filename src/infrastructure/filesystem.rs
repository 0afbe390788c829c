use crate::config::ServerConfig;
use anyhow::Context;
use tracing::info;

/// Creates the public artifact directory and the scratch root if missing.
pub async fn prepare_directories(server: &ServerConfig) -> anyhow::Result<()> {
    for dir in [&server.public_dir, &server.temp_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create directory {}", dir.display()))?;
        info!("📁 Directory ready: {}", dir.display());
    }
    Ok(())
}
