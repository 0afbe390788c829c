use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{
    BACKGROUND_FOLDER, BackgroundRemovalStrategy, RemovalArtifact, RemovalInput, StrategyError,
};
use crate::config::CloudinaryConfig;

const REMOVAL_ADDON: &str = "cloudinary_ai";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
    error: Option<UploadError>,
}

#[derive(Debug, Deserialize)]
struct UploadError {
    message: Option<String>,
}

/// Signs upload parameters: sorted `k=v` pairs joined by `&`, followed by the
/// API secret, hashed with SHA-256.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Uploads to Cloudinary with the AI background-removal add-on.
pub struct CloudinaryStrategy {
    client: Client,
    config: Option<CloudinaryConfig>,
}

impl CloudinaryStrategy {
    pub fn new(client: Client, config: Option<CloudinaryConfig>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl BackgroundRemovalStrategy for CloudinaryStrategy {
    fn name(&self) -> &'static str {
        "cloudinary"
    }

    fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn attempt(&self, input: &RemovalInput<'_>) -> Result<RemovalArtifact, StrategyError> {
        let Some(config) = &self.config else {
            return Err(StrategyError::Rejected("credentials not configured".into()));
        };

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string();
        let params = [
            ("background_removal", REMOVAL_ADDON.to_string()),
            ("folder", BACKGROUND_FOLDER.to_string()),
            ("timestamp", timestamp),
        ];
        let signature = sign(&params, &config.api_secret);

        let file_name = input
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let bytes = tokio::fs::read(input.source).await?;
        let mime = mime_guess::from_path(input.source).first_or_octet_stream();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.as_ref())?;

        let mut form = Form::new()
            .part("file", part)
            .text("api_key", config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let url = format!(
            "{}/{}/image/upload",
            config.api_base_url.trim_end_matches('/'),
            config.cloud_name
        );
        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status();
        let payload: UploadResponse = response.json().await?;

        if let Some(message) = payload.error.and_then(|e| e.message) {
            return Err(StrategyError::Rejected(message));
        }
        match payload.secure_url.filter(|u| !u.is_empty()) {
            Some(url) => Ok(RemovalArtifact {
                url,
                id: payload.public_id,
            }),
            None => Err(StrategyError::Rejected(format!(
                "no secure_url in response (status {})",
                status
            ))),
        }
    }
}
