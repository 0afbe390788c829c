use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{BackgroundRemovalStrategy, RemovalArtifact, RemovalInput, StrategyError};
use crate::config::{BackgroundRemovalConfig, PUBLIC_URL_PREFIX};
use crate::services::process::{ProcessRunner, ProcessSpec};
use crate::services::scratch::ScratchFile;

/// Shells out to a segmentation CLI (`rembg i -m <model> in out`).
///
/// The output lands directly in the public directory; it is only kept when
/// the tool exits cleanly and the file actually exists.
pub struct ExternalProcessStrategy {
    runner: Arc<dyn ProcessRunner>,
    config: BackgroundRemovalConfig,
    public_dir: PathBuf,
    timeout: Duration,
}

impl ExternalProcessStrategy {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        config: BackgroundRemovalConfig,
        public_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            config,
            public_dir,
            timeout,
        }
    }
}

#[async_trait]
impl BackgroundRemovalStrategy for ExternalProcessStrategy {
    fn name(&self) -> &'static str {
        "rembg"
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn attempt(&self, input: &RemovalInput<'_>) -> Result<RemovalArtifact, StrategyError> {
        tokio::fs::create_dir_all(&self.public_dir).await?;
        let output = ScratchFile::unique_in(&self.public_dir, "nobg-", ".png")?;

        let spec = ProcessSpec::new(&self.config.program, self.timeout)
            .arg("i")
            .arg("-m")
            .arg(&self.config.model)
            .arg(input.source.as_os_str())
            .arg(output.path().as_os_str());
        self.runner.run(spec).await?;

        if !tokio::fs::try_exists(output.path()).await.unwrap_or(false) {
            return Err(StrategyError::MissingOutput);
        }

        let kept = output.persist();
        let name = kept
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(RemovalArtifact {
            url: format!("{}/{}", PUBLIC_URL_PREFIX, name),
            id: Some(name),
        })
    }
}
