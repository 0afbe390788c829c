use std::io;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, TempPath};
use tracing::warn;
use uuid::Uuid;

/// A single local file that is removed when dropped.
///
/// Removal is best-effort: a file that is already gone is fine, any other
/// failure is logged and swallowed.
#[derive(Debug)]
pub struct ScratchFile {
    path: Option<TempPath>,
}

impl ScratchFile {
    /// Takes ownership of `path`; nothing needs to exist there yet.
    /// Relative paths are resolved against the current directory.
    pub fn adopt(path: impl Into<PathBuf>) -> io::Result<Self> {
        Ok(Self {
            path: Some(TempPath::try_from_path(path)?),
        })
    }

    /// Reserves a unique name `<prefix><uuid><ext>` inside `dir`.
    pub fn unique_in(dir: &Path, prefix: &str, ext: &str) -> io::Result<Self> {
        Self::adopt(dir.join(format!("{}{}{}", prefix, Uuid::new_v4(), ext)))
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Keeps the file on disk and returns its path.
    pub fn persist(mut self) -> PathBuf {
        let Some(path) = self.path.take() else {
            return PathBuf::new();
        };
        let shown = path.to_path_buf();
        if let Err(e) = path.keep() {
            warn!("Failed to keep scratch file {}: {}", shown.display(), e.error);
        }
        shown
    }

    pub async fn size(&self) -> io::Result<u64> {
        Ok(tokio::fs::metadata(self.path()).await?.len())
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.to_path_buf();
            if let Err(e) = path.close() {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove scratch file {}: {}", shown.display(), e);
                }
            }
        }
    }
}

/// A per-request directory under the temp root, removed recursively on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
}

impl ScratchDir {
    pub fn new_in(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix("req-").tempdir_in(root)?;
        Ok(Self { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .map(|d| d.path())
            .unwrap_or_else(|| Path::new(""))
    }

    pub fn file(&self, prefix: &str, ext: &str) -> io::Result<ScratchFile> {
        ScratchFile::unique_in(self.path(), prefix, ext)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let shown = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(
                        "Failed to remove scratch directory {}: {}",
                        shown.display(),
                        e
                    );
                }
            }
        }
    }
}

/// An uploaded file staged on local disk, with what the client declared about it.
#[derive(Debug)]
pub struct StagedUpload {
    pub file: ScratchFile,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Extension of the original file name, including the dot, or empty.
    pub fn extension(&self) -> String {
        Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }
}
