use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::api::error::AppError;
use crate::services::scratch::{ScratchFile, StagedUpload};

/// What a single endpoint accepts in its multipart body.
pub struct UploadPolicy<'a> {
    /// Form field carrying the file(s)
    pub field: &'a str,
    pub allowed_mimes: &'a [&'a str],
    pub max_file_size: u64,
    pub max_files: usize,
    /// Shown when a file has a disallowed content type
    pub type_error: &'a str,
}

/// Staged files plus any plain text fields sent alongside them.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<StagedUpload>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Takes the single expected file, or fails with `missing`.
    pub fn single_file(&mut self, missing: &str) -> Result<StagedUpload, AppError> {
        if self.files.is_empty() {
            return Err(AppError::BadRequest(missing.to_string()));
        }
        Ok(self.files.remove(0))
    }
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::Internal(format!("Failed to stage upload: {}", e))
}

/// Streams each file part to a scratch file under `temp_dir`, enforcing the
/// policy as bytes arrive. Anything already staged is removed if a later
/// part is rejected.
pub async fn read_upload_form(
    mut multipart: Multipart,
    policy: &UploadPolicy<'_>,
    temp_dir: &Path,
) -> Result<UploadForm, AppError> {
    tokio::fs::create_dir_all(temp_dir).await.map_err(io_error)?;
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        let Some(original_name) = field.file_name().map(|n| n.to_string()) else {
            let value = field.text().await?;
            form.fields.insert(name, value);
            continue;
        };

        if name != policy.field {
            return Err(AppError::BadRequest(format!(
                "Unexpected file field `{}`",
                name
            )));
        }
        if form.files.len() >= policy.max_files {
            return Err(AppError::BadRequest(format!(
                "Too many files. At most {} are allowed.",
                policy.max_files
            )));
        }

        let content_type = field
            .content_type()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        if !policy.allowed_mimes.contains(&content_type.as_str()) {
            warn!(
                "Rejected upload {} with content type {}",
                original_name, content_type
            );
            return Err(AppError::BadRequest(policy.type_error.to_string()));
        }

        let ext = Path::new(&original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        let scratch = ScratchFile::unique_in(temp_dir, "upload-", &ext).map_err(io_error)?;
        let mut out = tokio::fs::File::create(scratch.path())
            .await
            .map_err(io_error)?;

        let mut size: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            if size > policy.max_file_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "File {} exceeds the {} MB limit",
                    original_name,
                    policy.max_file_size / 1024 / 1024
                )));
            }
            out.write_all(&chunk).await.map_err(io_error)?;
        }
        out.flush().await.map_err(io_error)?;

        debug!("Staged {} ({} bytes)", original_name, size);
        form.files.push(StagedUpload {
            file: scratch,
            original_name,
            content_type,
            size,
        });
    }

    Ok(form)
}
