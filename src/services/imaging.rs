use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageOpsError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image task aborted: {0}")]
    Join(String),
}

fn load(path: &Path) -> Result<DynamicImage, ImageOpsError> {
    image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| ImageOpsError::Decode(e.to_string()))
}

/// Re-encodes any supported raster as baseline JPEG at `quality`.
pub fn compress_jpeg(input: &Path, output: &Path, quality: u8) -> Result<(), ImageOpsError> {
    let img = load(input)?;
    // JPEG has no alpha; flatten to RGB first.
    let rgb = img.to_rgb8();

    let writer = BufWriter::new(File::create(output)?);
    let mut encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| ImageOpsError::Encode(e.to_string()))?;
    Ok(())
}

/// Decodes the image, adds an alpha channel and writes it as PNG.
pub fn add_alpha_png(input: &Path, output: &Path) -> Result<(), ImageOpsError> {
    let img = load(input)?;
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    rgba.save_with_format(output, ImageFormat::Png)
        .map_err(|e| ImageOpsError::Encode(e.to_string()))
}

/// Runs `compress_jpeg` off the async runtime.
pub async fn compress_jpeg_blocking(
    input: PathBuf,
    output: PathBuf,
    quality: u8,
) -> Result<(), ImageOpsError> {
    tokio::task::spawn_blocking(move || compress_jpeg(&input, &output, quality))
        .await
        .map_err(|e| ImageOpsError::Join(e.to_string()))?
}

pub async fn add_alpha_png_blocking(input: PathBuf, output: PathBuf) -> Result<(), ImageOpsError> {
    tokio::task::spawn_blocking(move || add_alpha_png(&input, &output))
        .await
        .map_err(|e| ImageOpsError::Join(e.to_string()))?
}
