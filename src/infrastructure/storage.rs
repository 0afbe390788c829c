use crate::config::{ServerConfig, StorageBackend, StorageConfig};
use crate::services::storage::{ArtifactStore, LocalArtifactStore, S3ArtifactStore};
use anyhow::Context;
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn setup_storage(
    config: &StorageConfig,
    server: &ServerConfig,
) -> anyhow::Result<Arc<dyn ArtifactStore>> {
    match config.backend {
        StorageBackend::Local => {
            info!("💾 Local artifact storage: {}", server.public_dir.display());
            Ok(Arc::new(LocalArtifactStore::new(server.public_dir.clone())))
        }
        StorageBackend::S3 => setup_s3(config).await,
    }
}

async fn setup_s3(config: &StorageConfig) -> anyhow::Result<Arc<dyn ArtifactStore>> {
    let endpoint_url = config
        .s3_endpoint
        .clone()
        .context("S3_ENDPOINT must be set when STORAGE_BACKEND=s3")?;
    let access_key = config
        .s3_access_key
        .clone()
        .context("S3_ACCESS_KEY must be set when STORAGE_BACKEND=s3")?;
    let secret_key = config
        .s3_secret_key
        .clone()
        .context("S3_SECRET_KEY must be set when STORAGE_BACKEND=s3")?;

    info!(
        "☁️  S3 Storage: {} (Bucket: {})",
        endpoint_url, config.s3_bucket
    );

    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(Credentials::new(
            access_key, secret_key, None, None, "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let client = aws_sdk_s3::Client::from_conf(s3_config);

    if client
        .head_bucket()
        .bucket(&config.s3_bucket)
        .send()
        .await
        .is_err()
    {
        info!("🪣 Creating bucket {}", config.s3_bucket);
        if let Err(e) = client
            .create_bucket()
            .bucket(&config.s3_bucket)
            .send()
            .await
        {
            warn!("Could not create bucket {}: {:?}", config.s3_bucket, e);
        }
    }

    Ok(Arc::new(S3ArtifactStore::new(
        client,
        config.s3_bucket.clone(),
        config.s3_public_base_url.clone(),
    )))
}
