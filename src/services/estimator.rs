//! Maps a compression request onto concrete encoder parameters.
//!
//! Every function here is pure: given the same mode and sizes it always
//! produces the same parameters.

const AUDIO_MIN_KBPS: u32 = 32;
const AUDIO_MAX_KBPS: u32 = 320;
const AUDIO_DEFAULT_KBPS: u32 = 128;
const IMAGE_DEFAULT_QUALITY: u8 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionMode {
    /// Named tier (`low`/`medium`/`high`) or a numeric override.
    Preset { quality: Option<String> },
    /// Aim for roughly this many bytes.
    TargetSize { target_bytes: u64 },
}

impl CompressionMode {
    /// Builds a mode from raw form fields.
    ///
    /// Absent or unknown `mode` means preset. A missing, malformed or
    /// non-positive target size falls back to half the original size.
    pub fn from_form(
        mode: Option<&str>,
        quality: Option<&str>,
        target_size: Option<&str>,
        original_size: u64,
    ) -> Self {
        match mode.map(str::trim) {
            Some("targetSize") => {
                let target_bytes = target_size
                    .and_then(|t| t.trim().parse::<f64>().ok())
                    .filter(|t| t.is_finite() && *t > 0.0)
                    .map(|t| t as u64)
                    .filter(|t| *t > 0)
                    .unwrap_or(original_size / 2);
                CompressionMode::TargetSize { target_bytes }
            }
            _ => CompressionMode::Preset {
                quality: quality
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoProfile {
    pub video_kbps: u32,
    pub audio_kbps: u32,
    pub max_width: u32,
}

impl VideoProfile {
    pub const LOW: VideoProfile = VideoProfile {
        video_kbps: 500,
        audio_kbps: 64,
        max_width: 640,
    };
    pub const MEDIUM: VideoProfile = VideoProfile {
        video_kbps: 1000,
        audio_kbps: 128,
        max_width: 1280,
    };
    pub const HIGH: VideoProfile = VideoProfile {
        video_kbps: 2000,
        audio_kbps: 192,
        max_width: 1920,
    };
}

fn ratio(target: u64, original: u64) -> f64 {
    if original == 0 {
        return 1.0;
    }
    target as f64 / original as f64
}

/// Audio bitrate in kbps, always within 32..=320.
pub fn audio_bitrate(mode: &CompressionMode, original_size: u64) -> u32 {
    let kbps = match mode {
        CompressionMode::Preset { quality } => match quality.as_deref() {
            Some(q) => match q.parse::<f64>() {
                Ok(n) if n.is_finite() => n.round().max(0.0) as u32,
                _ => match q {
                    "low" => 64,
                    "medium" => 128,
                    "high" => 192,
                    _ => AUDIO_DEFAULT_KBPS,
                },
            },
            None => AUDIO_DEFAULT_KBPS,
        },
        CompressionMode::TargetSize { target_bytes } => {
            let r = ratio(*target_bytes, original_size);
            if r < 0.25 {
                32
            } else if r < 0.5 {
                64
            } else if r < 0.75 {
                96
            } else {
                128
            }
        }
    };
    kbps.clamp(AUDIO_MIN_KBPS, AUDIO_MAX_KBPS)
}

pub fn video_profile(mode: &CompressionMode) -> VideoProfile {
    match mode {
        CompressionMode::Preset { quality } => match quality.as_deref() {
            Some("low") => VideoProfile::LOW,
            Some("high") => VideoProfile::HIGH,
            _ => VideoProfile::MEDIUM,
        },
        CompressionMode::TargetSize { target_bytes } => {
            let mb = *target_bytes as f64 / (1024.0 * 1024.0);
            if mb < 5.0 {
                VideoProfile::LOW
            } else if mb < 20.0 {
                VideoProfile::MEDIUM
            } else {
                VideoProfile::HIGH
            }
        }
    }
}

/// JPEG quality in 1..=100.
pub fn image_quality(mode: &CompressionMode, original_size: u64) -> u8 {
    match mode {
        CompressionMode::Preset { quality } => match quality.as_deref() {
            Some(q) => match q.parse::<f64>() {
                Ok(n) if n.is_finite() => n.round().clamp(1.0, 100.0) as u8,
                _ => match q {
                    "low" => 60,
                    "medium" => 80,
                    "high" => 90,
                    _ => IMAGE_DEFAULT_QUALITY,
                },
            },
            None => IMAGE_DEFAULT_QUALITY,
        },
        CompressionMode::TargetSize { target_bytes } => {
            let r = ratio(*target_bytes, original_size);
            if r < 0.3 {
                50
            } else if r < 0.6 {
                70
            } else {
                85
            }
        }
    }
}

/// Percentage saved, rounded. Negative when the output grew; 0 for empty input.
pub fn compression_rate(original: u64, compressed: u64) -> i64 {
    if original == 0 {
        return 0;
    }
    ((1.0 - compressed as f64 / original as f64) * 100.0).round() as i64
}
