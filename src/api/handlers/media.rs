use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;
use utoipa::ToSchema;

use super::upload::{UploadPolicy, read_upload_form};
use crate::AppState;
use crate::api::error::AppError;
use crate::config::{AUDIO_MIME_TYPES, IMAGE_MIME_TYPES, VIDEO_MIME_TYPES};
use crate::services::estimator::CompressionMode;
use crate::services::media::CompressionReport;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompressionResponse {
    pub success: bool,
    pub message: String,
    pub file_name: String,
    pub download_url: String,
    pub public_id: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub compression_rate: i64,
}

impl CompressionResponse {
    fn new(message: &str, report: CompressionReport) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            file_name: report.file_name,
            download_url: report.artifact.url,
            public_id: report.artifact.id,
            original_size: report.original_size,
            compressed_size: report.compressed_size,
            compression_rate: report.compression_rate,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBackgroundResponse {
    pub success: bool,
    pub message: String,
    pub download_url: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    /// Strategy that produced the image
    pub method: String,
}

enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    fn field(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }

    fn mimes(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_MIME_TYPES,
            MediaKind::Audio => AUDIO_MIME_TYPES,
            MediaKind::Video => VIDEO_MIME_TYPES,
        }
    }

    fn type_error(&self) -> &'static str {
        match self {
            MediaKind::Image => "Invalid file type. Only JPEG, PNG, GIF and WebP images are allowed.",
            MediaKind::Audio => "Invalid file type. Only MP3, WAV and OGG audio files are allowed.",
            MediaKind::Video => "Invalid file type. Only MP4, MPEG, MOV and WebM videos are allowed.",
        }
    }

    fn missing(&self) -> &'static str {
        match self {
            MediaKind::Image => "Please provide an image file to compress.",
            MediaKind::Audio => "Please provide an audio file to compress.",
            MediaKind::Video => "Please provide a video file to compress.",
        }
    }
}

async fn compress(
    state: &AppState,
    multipart: Multipart,
    kind: MediaKind,
) -> Result<Json<CompressionResponse>, AppError> {
    let policy = UploadPolicy {
        field: kind.field(),
        allowed_mimes: kind.mimes(),
        max_file_size: state.config.uploads.max_media_size,
        max_files: 1,
        type_error: kind.type_error(),
    };
    let mut form = read_upload_form(multipart, &policy, &state.config.server.temp_dir).await?;
    let upload = form.single_file(kind.missing())?;

    let mode = CompressionMode::from_form(
        form.text("mode"),
        form.text("quality"),
        form.text("targetSize"),
        upload.size,
    );

    let response = match kind {
        MediaKind::Image => state
            .media
            .compress_image(upload, &mode)
            .await
            .map(|r| CompressionResponse::new("Image successfully compressed", r))
            .map_err(|e| AppError::upstream("Error compressing image file", e))?,
        MediaKind::Audio => state
            .media
            .compress_audio(upload, &mode)
            .await
            .map(|r| CompressionResponse::new("Audio successfully compressed", r))
            .map_err(|e| AppError::upstream("Error compressing audio file", e))?,
        MediaKind::Video => state
            .media
            .compress_video(upload, &mode)
            .await
            .map(|r| CompressionResponse::new("Video successfully compressed", r))
            .map_err(|e| AppError::upstream("Error compressing video file", e))?,
    };

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/media/compress-image",
    request_body(content = Object, description = "Multipart: `image` file, `mode` (preset|targetSize), `quality`, `targetSize`", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image compressed", body = CompressionResponse),
        (status = 400, description = "Missing or unsupported file"),
        (status = 413, description = "File too large"),
        (status = 500, description = "Compression failed")
    ),
    tag = "media"
)]
pub async fn compress_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CompressionResponse>, AppError> {
    compress(&state, multipart, MediaKind::Image).await
}

#[utoipa::path(
    post,
    path = "/api/media/compress-audio",
    request_body(content = Object, description = "Multipart: `audio` file, `mode` (preset|targetSize), `quality`, `targetSize`", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Audio compressed", body = CompressionResponse),
        (status = 400, description = "Missing or unsupported file"),
        (status = 413, description = "File too large"),
        (status = 500, description = "Compression failed")
    ),
    tag = "media"
)]
pub async fn compress_audio(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CompressionResponse>, AppError> {
    compress(&state, multipart, MediaKind::Audio).await
}

#[utoipa::path(
    post,
    path = "/api/media/compress-video",
    request_body(content = Object, description = "Multipart: `video` file, `mode` (preset|targetSize), `quality`, `targetSize`", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video compressed", body = CompressionResponse),
        (status = 400, description = "Missing or unsupported file"),
        (status = 413, description = "File too large"),
        (status = 500, description = "Compression failed")
    ),
    tag = "media"
)]
pub async fn compress_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CompressionResponse>, AppError> {
    compress(&state, multipart, MediaKind::Video).await
}

#[utoipa::path(
    post,
    path = "/api/media/remove-bg",
    request_body(content = Object, description = "Multipart: `image` file", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Background removed", body = RemoveBackgroundResponse),
        (status = 400, description = "Missing or unsupported file"),
        (status = 500, description = "Every strategy failed; body carries `fallback: true`")
    ),
    tag = "media"
)]
pub async fn remove_background(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RemoveBackgroundResponse>, AppError> {
    let policy = UploadPolicy {
        field: "image",
        allowed_mimes: IMAGE_MIME_TYPES,
        max_file_size: state.config.uploads.max_media_size,
        max_files: 1,
        type_error: MediaKind::Image.type_error(),
    };
    let mut form = read_upload_form(multipart, &policy, &state.config.server.temp_dir).await?;
    let upload = form.single_file("Please provide an image file.")?;

    let outcome = state
        .background
        .remove_background(upload.path())
        .await?;

    Ok(Json(RemoveBackgroundResponse {
        success: true,
        message: format!("Background removed successfully using {}!", outcome.strategy),
        download_url: outcome.url.clone(),
        image_url: outcome.url,
        public_id: outcome.id,
        method: outcome.strategy.to_string(),
    }))
}
