use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PUBLIC_URL_PREFIX;
use crate::services::scratch::{ScratchFile, StagedUpload};

#[derive(Debug, Error)]
pub enum PdfMergeError {
    #[error("No valid PDF pages were found in the uploaded files.")]
    NoValidPages,

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Merge task aborted: {0}")]
    Join(String),
}

#[derive(Debug, Clone)]
pub struct MergedPdf {
    pub file_name: String,
    pub download_url: String,
    pub page_count: usize,
    /// Original names of inputs that could not be read.
    pub skipped: Vec<String>,
}

pub struct PdfMergeService {
    public_dir: PathBuf,
}

impl PdfMergeService {
    pub fn new(public_dir: PathBuf) -> Self {
        Self { public_dir }
    }

    /// Concatenates the pages of every readable input, in upload order.
    pub async fn merge(&self, uploads: &[StagedUpload]) -> Result<MergedPdf, PdfMergeError> {
        tokio::fs::create_dir_all(&self.public_dir).await?;
        let output = ScratchFile::unique_in(&self.public_dir, "merged-", ".pdf")?;

        let inputs: Vec<(String, PathBuf)> = uploads
            .iter()
            .map(|u| (u.original_name.clone(), u.path().to_path_buf()))
            .collect();
        let target = output.path().to_path_buf();

        let (page_count, skipped) =
            tokio::task::spawn_blocking(move || merge_files(&inputs, &target))
                .await
                .map_err(|e| PdfMergeError::Join(e.to_string()))??;

        let kept = output.persist();
        let file_name = kept
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        info!(
            "Merged {} PDFs into {} ({} pages, {} skipped)",
            uploads.len(),
            file_name,
            page_count,
            skipped.len()
        );

        Ok(MergedPdf {
            download_url: format!("{}/{}", PUBLIC_URL_PREFIX, file_name),
            file_name,
            page_count,
            skipped,
        })
    }
}

fn load_input(name: &str, path: &Path) -> Option<Document> {
    match Document::load(path) {
        Ok(doc) if doc.is_encrypted() => {
            warn!("Skipping encrypted PDF {}", name);
            None
        }
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!("Skipping unreadable PDF {}: {}", name, e);
            None
        }
    }
}

/// Writes the merged document to `output` and returns its page count and the
/// names of skipped inputs.
fn merge_files(
    inputs: &[(String, PathBuf)],
    output: &Path,
) -> Result<(usize, Vec<String>), PdfMergeError> {
    let mut skipped = Vec::new();
    let mut documents = Vec::new();
    for (name, path) in inputs {
        match load_input(name, path) {
            Some(doc) if !doc.get_pages().is_empty() => documents.push(doc),
            Some(_) => {
                warn!("Skipping PDF {} with no pages", name);
                skipped.push(name.clone());
            }
            None => skipped.push(name.clone()),
        }
    }

    if documents.is_empty() {
        return Err(PdfMergeError::NoValidPages);
    }

    let mut merged = merge_documents(documents)?;
    let page_count = merged.get_pages().len();
    if page_count == 0 {
        return Err(PdfMergeError::NoValidPages);
    }

    merged.compress();
    merged.save(output)?;

    Ok((page_count, skipped))
}

/// Page attributes a page may inherit from an ancestor `Pages` node.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

/// Copies the page dictionary, filling in attributes it inherits from its
/// ancestors so it renders the same once moved under a new parent.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary, PdfMergeError> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    let mut visited = BTreeSet::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    while let Some(node_id) = parent {
        if !visited.insert(node_id) {
            warn!("Page tree cycle at object {:?}", node_id);
            break;
        }
        let Ok(node) = doc.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key, value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}

fn merge_documents(documents: Vec<Document>) -> Result<Document, PdfMergeError> {
    let mut merged = Document::with_version("1.5");
    let mut max_id = 1;
    // Pages in upload order, then page order within each document.
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            pages.push((page_id, flatten_page(&doc, page_id)?));
        }

        for (object_id, object) in doc.objects {
            // The page tree is rebuilt below; outlines would point at stale ids.
            let structural = matches!(
                object.type_name().unwrap_or_default(),
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline"
            );
            if !structural {
                merged.objects.insert(object_id, object);
            }
        }
    }

    if pages.is_empty() {
        return Err(PdfMergeError::NoValidPages);
    }

    let pages_id: ObjectId = (max_id, 0);
    let catalog_id: ObjectId = (max_id + 1, 0);
    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let count = pages.len() as i64;

    for (page_id, mut page) in pages {
        page.set("Parent", Object::Reference(pages_id));
        merged.objects.insert(page_id, Object::Dictionary(page));
    }
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    merged.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );

    merged.trailer.set("Root", Object::Reference(catalog_id));
    merged.max_id = catalog_id.0;
    merged.renumber_objects();

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;

    fn sample_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for _ in 0..pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, b"".to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    /// Pages sit under an intermediate node and inherit MediaBox and Rotate
    /// from the root `Pages` node.
    fn nested_pdf(width: i64, pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let root_id = doc.new_object_id();
        let branch_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for _ in 0..pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, b"".to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => branch_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            branch_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Parent" => root_id,
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        doc.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(branch_id)],
                "Count" => pages as i64,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), 842.into()],
                "Rotate" => 90,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => root_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn stage(dir: &Path, name: &str, bytes: &[u8]) -> StagedUpload {
        let file = ScratchFile::unique_in(dir, "pdf-", ".pdf").unwrap();
        std::fs::write(file.path(), bytes).unwrap();
        StagedUpload {
            file,
            original_name: name.to_string(),
            content_type: "application/pdf".to_string(),
            size: bytes.len() as u64,
        }
    }

    #[tokio::test]
    async fn test_merge_sums_pages() {
        let temp = tempfile::tempdir().unwrap();
        let public = tempfile::tempdir().unwrap();
        let uploads = vec![
            stage(temp.path(), "a.pdf", &sample_pdf(2)),
            stage(temp.path(), "b.pdf", &sample_pdf(3)),
        ];

        let service = PdfMergeService::new(public.path().to_path_buf());
        let merged = service.merge(&uploads).await.unwrap();

        assert_eq!(merged.page_count, 5);
        assert!(merged.skipped.is_empty());
        assert!(merged.download_url.starts_with("/uploads/merged-"));

        let reloaded = Document::load(public.path().join(&merged.file_name)).unwrap();
        assert_eq!(reloaded.get_pages().len(), 5);
    }

    #[tokio::test]
    async fn test_merge_keeps_inherited_page_attributes() {
        let temp = tempfile::tempdir().unwrap();
        let public = tempfile::tempdir().unwrap();
        let uploads = vec![
            stage(temp.path(), "narrow.pdf", &nested_pdf(100, 2)),
            stage(temp.path(), "wide.pdf", &nested_pdf(500, 2)),
        ];

        let service = PdfMergeService::new(public.path().to_path_buf());
        let merged = service.merge(&uploads).await.unwrap();
        assert_eq!(merged.page_count, 4);

        let reloaded = Document::load(public.path().join(&merged.file_name)).unwrap();
        let mut widths = Vec::new();
        for (_, page_id) in reloaded.get_pages() {
            let page = reloaded.get_dictionary(page_id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            widths.push(media_box[2].as_i64().unwrap());
            assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);
        }
        assert_eq!(widths, vec![100, 100, 500, 500]);

        let root_id = reloaded.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let catalog = reloaded.get_dictionary(root_id).unwrap();
        let pages_id = catalog.get(b"Pages").unwrap().as_reference().unwrap();
        let pages = reloaded.get_dictionary(pages_id).unwrap();
        assert!(!pages.has(b"Parent"));
        assert!(!pages.has(b"MediaBox"));
        assert_eq!(pages.get(b"Count").unwrap().as_i64().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_unreadable_inputs_are_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let public = tempfile::tempdir().unwrap();
        let uploads = vec![
            stage(temp.path(), "a.pdf", &sample_pdf(1)),
            stage(temp.path(), "junk.pdf", b"%PDF-1.4 this is not really a pdf"),
            stage(temp.path(), "c.pdf", &sample_pdf(2)),
        ];

        let service = PdfMergeService::new(public.path().to_path_buf());
        let merged = service.merge(&uploads).await.unwrap();

        assert_eq!(merged.page_count, 3);
        assert_eq!(merged.skipped, vec!["junk.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_all_invalid_fails_without_output() {
        let temp = tempfile::tempdir().unwrap();
        let public = tempfile::tempdir().unwrap();
        let uploads = vec![
            stage(temp.path(), "x.pdf", b"garbage"),
            stage(temp.path(), "y.pdf", b"more garbage"),
        ];

        let service = PdfMergeService::new(public.path().to_path_buf());
        let result = service.merge(&uploads).await;

        assert!(matches!(result, Err(PdfMergeError::NoValidPages)));
        assert_eq!(std::fs::read_dir(public.path()).unwrap().count(), 0);
    }
}
