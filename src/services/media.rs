use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::services::estimator::{self, CompressionMode, VideoProfile};
use crate::services::imaging::{self, ImageOpsError};
use crate::services::process::{ProcessError, ProcessRunner, ProcessSpec};
use crate::services::scratch::{ScratchFile, StagedUpload};
use crate::services::storage::{ArtifactStore, StorageError, StoredArtifact};

pub const IMAGE_FOLDER: &str = "compressed_images";
pub const AUDIO_FOLDER: &str = "compressed_audio";
pub const VIDEO_FOLDER: &str = "compressed_videos";

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Image(#[from] ImageOpsError),

    #[error("Transcoder produced no output file")]
    MissingOutput,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct CompressionReport {
    pub file_name: String,
    pub artifact: StoredArtifact,
    pub original_size: u64,
    pub compressed_size: u64,
    pub compression_rate: i64,
}

/// Thin wrapper over the ffmpeg CLI.
pub struct FfmpegTranscoder {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(runner: Arc<dyn ProcessRunner>, program: String, timeout: Duration) -> Self {
        Self {
            runner,
            program,
            timeout,
        }
    }

    fn base(&self, input: &Path) -> ProcessSpec {
        ProcessSpec::new(&self.program, self.timeout)
            .arg("-y")
            .arg("-i")
            .arg(input.as_os_str())
    }

    pub async fn audio(&self, input: &Path, output: &Path, kbps: u32) -> Result<(), TranscodeError> {
        let spec = self
            .base(input)
            .arg("-b:a")
            .arg(format!("{}k", kbps))
            .arg(output.as_os_str());
        self.runner.run(spec).await?;
        ensure_output(output).await
    }

    pub async fn video(
        &self,
        input: &Path,
        output: &Path,
        profile: VideoProfile,
    ) -> Result<(), TranscodeError> {
        let spec = self
            .base(input)
            .arg("-b:v")
            .arg(format!("{}k", profile.video_kbps))
            .arg("-b:a")
            .arg(format!("{}k", profile.audio_kbps))
            .arg("-vf")
            .arg(format!("scale={}:-2", profile.max_width))
            .arg(output.as_os_str());
        self.runner.run(spec).await?;
        ensure_output(output).await
    }
}

async fn ensure_output(output: &Path) -> Result<(), TranscodeError> {
    if tokio::fs::try_exists(output).await.unwrap_or(false) {
        Ok(())
    } else {
        Err(TranscodeError::MissingOutput)
    }
}

/// Compresses uploaded media and hands the result to the artifact store.
///
/// Input and output scratch files are dropped (and removed) before any
/// method returns, whatever the outcome.
pub struct MediaService {
    transcoder: FfmpegTranscoder,
    store: Arc<dyn ArtifactStore>,
    temp_dir: PathBuf,
}

impl MediaService {
    pub fn new(
        transcoder: FfmpegTranscoder,
        store: Arc<dyn ArtifactStore>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            transcoder,
            store,
            temp_dir,
        }
    }

    async fn output_file(&self, ext: &str) -> Result<ScratchFile, TranscodeError> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        Ok(ScratchFile::unique_in(&self.temp_dir, "compressed-", ext)?)
    }

    pub async fn compress_image(
        &self,
        upload: StagedUpload,
        mode: &CompressionMode,
    ) -> Result<CompressionReport, TranscodeError> {
        let quality = estimator::image_quality(mode, upload.size);
        info!(
            "Compressing image {} ({} bytes) at quality {}",
            upload.original_name, upload.size, quality
        );

        let output = self.output_file(".jpg").await?;
        imaging::compress_jpeg_blocking(
            upload.path().to_path_buf(),
            output.path().to_path_buf(),
            quality,
        )
        .await?;

        self.finish(upload, output, IMAGE_FOLDER).await
    }

    pub async fn compress_audio(
        &self,
        upload: StagedUpload,
        mode: &CompressionMode,
    ) -> Result<CompressionReport, TranscodeError> {
        let kbps = estimator::audio_bitrate(mode, upload.size);
        info!(
            "Compressing audio {} ({} bytes) at {}k",
            upload.original_name, upload.size, kbps
        );

        let output = self.output_file(&upload.extension()).await?;
        self.transcoder
            .audio(upload.path(), output.path(), kbps)
            .await?;

        self.finish(upload, output, AUDIO_FOLDER).await
    }

    pub async fn compress_video(
        &self,
        upload: StagedUpload,
        mode: &CompressionMode,
    ) -> Result<CompressionReport, TranscodeError> {
        let profile = estimator::video_profile(mode);
        info!(
            "Compressing video {} ({} bytes) with {:?}",
            upload.original_name, upload.size, profile
        );

        let output = self.output_file(&upload.extension()).await?;
        self.transcoder
            .video(upload.path(), output.path(), profile)
            .await?;

        self.finish(upload, output, VIDEO_FOLDER).await
    }

    async fn finish(
        &self,
        upload: StagedUpload,
        output: ScratchFile,
        folder: &str,
    ) -> Result<CompressionReport, TranscodeError> {
        let original_size = upload.size;
        let compressed_size = output.size().await?;
        let artifact = self.store.store(output.path(), folder).await?;

        let file_name = output
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let compression_rate = estimator::compression_rate(original_size, compressed_size);
        info!(
            "Compressed {} -> {} ({} -> {} bytes, {}%)",
            upload.original_name, file_name, original_size, compressed_size, compression_rate
        );

        Ok(CompressionReport {
            file_name,
            artifact,
            original_size,
            compressed_size,
            compression_rate,
        })
    }
}
