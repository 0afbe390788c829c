//! Background removal as an ordered list of strategies.
//!
//! Strategies run in order; the first success wins. Failures are logged and
//! the next strategy is tried. When nothing succeeds the caller receives every
//! attempt so the client can fall back to in-browser processing.

mod cloud;
mod external;
mod local;

pub use cloud::CloudinaryStrategy;
pub use external::ExternalProcessStrategy;
pub use local::LocalAlphaStrategy;

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::services::imaging::ImageOpsError;
use crate::services::process::ProcessError;
use crate::services::scratch::ScratchDir;
use crate::services::storage::StorageError;

pub const BACKGROUND_FOLDER: &str = "background_removed";

pub struct RemovalInput<'a> {
    pub source: &'a Path,
    pub scratch: &'a ScratchDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalArtifact {
    pub url: String,
    pub id: Option<String>,
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("tool exited cleanly but wrote no output")]
    MissingOutput,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service rejected the image: {0}")]
    Rejected(String),

    #[error(transparent)]
    Image(#[from] ImageOpsError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BackgroundRemovalStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn is_enabled(&self) -> bool;
    async fn attempt(&self, input: &RemovalInput<'_>) -> Result<RemovalArtifact, StrategyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub url: String,
    pub id: Option<String>,
    pub strategy: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub strategy: &'static str,
    pub reason: String,
}

impl fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("all background removal strategies failed ({})", format_attempts(.attempts))]
    Exhausted { attempts: Vec<FailedAttempt> },

    #[error("failed to prepare scratch space: {0}")]
    Scratch(#[from] std::io::Error),
}

fn format_attempts(attempts: &[FailedAttempt]) -> String {
    if attempts.is_empty() {
        return "none enabled".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct BackgroundRemover {
    strategies: Vec<Arc<dyn BackgroundRemovalStrategy>>,
    temp_root: PathBuf,
}

impl BackgroundRemover {
    pub fn new(strategies: Vec<Arc<dyn BackgroundRemovalStrategy>>, temp_root: PathBuf) -> Self {
        Self {
            strategies,
            temp_root,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies
            .iter()
            .filter(|s| s.is_enabled())
            .map(|s| s.name())
            .collect()
    }

    /// Runs the cascade against `source`. All intermediate files live in a
    /// per-call scratch directory that is gone by the time this returns.
    pub async fn remove_background(&self, source: &Path) -> Result<CascadeOutcome, CascadeError> {
        let scratch = ScratchDir::new_in(&self.temp_root)?;
        let input = RemovalInput {
            source,
            scratch: &scratch,
        };

        let mut attempts = Vec::new();
        for strategy in &self.strategies {
            if !strategy.is_enabled() {
                debug!("Skipping disabled background strategy {}", strategy.name());
                continue;
            }

            info!("Attempting background removal with {}", strategy.name());
            match strategy.attempt(&input).await {
                Ok(artifact) => {
                    info!("Background removed using {}", strategy.name());
                    return Ok(CascadeOutcome {
                        url: artifact.url,
                        id: artifact.id,
                        strategy: strategy.name(),
                    });
                }
                Err(e) => {
                    warn!("Background strategy {} failed: {}", strategy.name(), e);
                    attempts.push(FailedAttempt {
                        strategy: strategy.name(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(CascadeError::Exhausted { attempts })
    }
}
