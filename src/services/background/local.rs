use async_trait::async_trait;
use std::sync::Arc;

use super::{
    BACKGROUND_FOLDER, BackgroundRemovalStrategy, RemovalArtifact, RemovalInput, StrategyError,
};
use crate::services::imaging;
use crate::services::storage::ArtifactStore;

/// Last resort: re-encode as PNG with an alpha channel. No segmentation is
/// performed, so the result always "succeeds" for any decodable image.
pub struct LocalAlphaStrategy {
    store: Arc<dyn ArtifactStore>,
}

impl LocalAlphaStrategy {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BackgroundRemovalStrategy for LocalAlphaStrategy {
    fn name(&self) -> &'static str {
        "local"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn attempt(&self, input: &RemovalInput<'_>) -> Result<RemovalArtifact, StrategyError> {
        let output = input.scratch.file("nobg-", ".png")?;
        imaging::add_alpha_png_blocking(input.source.to_path_buf(), output.path().to_path_buf())
            .await?;

        let artifact = self.store.store(output.path(), BACKGROUND_FOLDER).await?;
        Ok(RemovalArtifact {
            url: artifact.url,
            id: Some(artifact.id),
        })
    }
}
