use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::PUBLIC_URL_PREFIX;

/// Default lifetime of a signed artifact URL, in seconds.
pub const DEFAULT_SIGNED_URL_TTL: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Where the client downloads the artifact.
    pub url: String,
    /// Backend identifier used for delete/sign.
    pub id: String,
    /// Extension without the dot, e.g. `jpg`.
    pub format: String,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to upload file to storage")]
    UploadFailed,

    #[error("Failed to delete file from storage")]
    DeleteFailed,

    #[error("Failed to sign URL")]
    SigningFailed,

    #[error("Artifact not found: {0}")]
    NotFound(String),
}

/// Remote home for finished artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    fn backend(&self) -> &'static str;
    async fn store(&self, local_path: &Path, folder: &str) -> Result<StoredArtifact, StorageError>;
    async fn delete(&self, id: &str) -> Result<(), StorageError>;
    async fn signed_url(&self, id: &str, expires_in_secs: u64) -> Result<String, StorageError>;
    async fn health_check(&self) -> bool;
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn format_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    public_base_url: Option<String>,
}

impl S3ArtifactStore {
    pub fn new(client: Client, bucket: String, public_base_url: Option<String>) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    fn backend(&self) -> &'static str {
        "s3"
    }

    async fn store(&self, local_path: &Path, folder: &str) -> Result<StoredArtifact, StorageError> {
        let name = file_name_of(local_path);
        let key = format!("{}/{}-{}", folder, Uuid::new_v4(), name);
        let content_type = mime_guess::from_path(local_path)
            .first_or_octet_stream()
            .to_string();

        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            error!("Failed to read {} for upload: {}", local_path.display(), e);
            StorageError::UploadFailed
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!("S3 upload of {} failed: {:?}", key, e);
                StorageError::UploadFailed
            })?;

        let url = match &self.public_base_url {
            Some(base) => format!("{}/{}", base, key),
            None => self.signed_url(&key, DEFAULT_SIGNED_URL_TTL).await?,
        };

        Ok(StoredArtifact {
            url,
            format: format_of(local_path),
            id: key,
        })
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .map_err(|e| {
                error!("S3 delete of {} failed: {:?}", id, e);
                StorageError::DeleteFailed
            })?;
        Ok(())
    }

    async fn signed_url(&self, id: &str, expires_in_secs: u64) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(Duration::from_secs(expires_in_secs))
            .map_err(|e| {
                error!("Invalid presigning config: {}", e);
                StorageError::SigningFailed
            })?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(id)
            .presigned(presigning)
            .await
            .map_err(|e| {
                error!("Failed to presign {}: {:?}", id, e);
                StorageError::SigningFailed
            })?;

        Ok(request.uri().to_string())
    }

    async fn health_check(&self) -> bool {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
    }
}

/// Keeps artifacts under the public directory, served at `/uploads`.
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, id: &str) -> Result<PathBuf, StorageError> {
        if id.is_empty() || id.split(['/', '\\']).any(|part| part == "..") || id.starts_with('/') {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(self.root.join(id))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn store(&self, local_path: &Path, folder: &str) -> Result<StoredArtifact, StorageError> {
        let name = file_name_of(local_path);
        let id = format!("{}/{}", folder, name);
        let dest = self.resolve(&id)?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create {}: {}", parent.display(), e);
                StorageError::UploadFailed
            })?;
        }

        tokio::fs::copy(local_path, &dest).await.map_err(|e| {
            error!(
                "Failed to copy {} to {}: {}",
                local_path.display(),
                dest.display(),
                e
            );
            StorageError::UploadFailed
        })?;

        info!("Stored artifact {}", id);

        Ok(StoredArtifact {
            url: format!("{}/{}", PUBLIC_URL_PREFIX, id),
            format: format_of(local_path),
            id,
        })
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let path = self.resolve(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => {
                error!("Failed to delete {}: {}", path.display(), e);
                Err(StorageError::DeleteFailed)
            }
        }
    }

    async fn signed_url(&self, id: &str, expires_in_secs: u64) -> Result<String, StorageError> {
        let path = self.resolve(id)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let expires = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            + expires_in_secs;
        Ok(format!("{}/{}?expires={}", PUBLIC_URL_PREFIX, id, expires))
    }

    async fn health_check(&self) -> bool {
        tokio::fs::create_dir_all(&self.root).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_round_trip() {
        let public = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let source = scratch.path().join("compressed-abc.jpg");
        std::fs::write(&source, b"jpeg-bytes").unwrap();

        let store = LocalArtifactStore::new(public.path());
        let artifact = store.store(&source, "compressed_images").await.unwrap();

        assert_eq!(artifact.id, "compressed_images/compressed-abc.jpg");
        assert_eq!(artifact.url, "/uploads/compressed_images/compressed-abc.jpg");
        assert_eq!(artifact.format, "jpg");
        assert_eq!(
            std::fs::read(public.path().join(&artifact.id)).unwrap(),
            b"jpeg-bytes"
        );

        let signed = store
            .signed_url(&artifact.id, DEFAULT_SIGNED_URL_TTL)
            .await
            .unwrap();
        assert!(signed.starts_with("/uploads/compressed_images/compressed-abc.jpg?expires="));

        store.delete(&artifact.id).await.unwrap();
        assert!(matches!(
            store.delete(&artifact.id).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_store_rejects_traversal() {
        let public = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(public.path());
        assert!(matches!(
            store.delete("../etc/passwd").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.signed_url("a/../../b", 60).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_store_missing_source_fails_generically() {
        let public = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(public.path());
        let result = store
            .store(Path::new("/nonexistent/file.png"), "background_removed")
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed)));
    }
}
