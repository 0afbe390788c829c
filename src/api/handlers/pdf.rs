use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;
use utoipa::ToSchema;

use super::upload::{UploadPolicy, read_upload_form};
use crate::AppState;
use crate::api::error::AppError;
use crate::config::PDF_MIME_TYPES;
use crate::services::pdf::PdfMergeError;

const MIN_MERGE_FILES: usize = 2;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MergePdfResponse {
    pub success: bool,
    pub message: String,
    pub download_url: String,
    pub page_count: usize,
}

#[utoipa::path(
    post,
    path = "/api/pdf/merge",
    request_body(content = Object, description = "Multipart: 2 to 20 `pdfs` files", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "PDFs merged", body = MergePdfResponse),
        (status = 400, description = "Fewer than two files, or a non-PDF upload"),
        (status = 413, description = "A file exceeds the size limit"),
        (status = 500, description = "No readable pages, or the merge failed")
    ),
    tag = "pdf"
)]
pub async fn merge_pdfs(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MergePdfResponse>, AppError> {
    let policy = UploadPolicy {
        field: "pdfs",
        allowed_mimes: PDF_MIME_TYPES,
        max_file_size: state.config.uploads.max_pdf_size,
        max_files: state.config.uploads.max_pdf_files,
        type_error: "Only PDF files are allowed.",
    };
    let form = read_upload_form(multipart, &policy, &state.config.server.temp_dir).await?;

    if form.files.len() < MIN_MERGE_FILES {
        return Err(AppError::BadRequest(
            "Please upload at least two PDF files to merge.".to_string(),
        ));
    }

    let merged = state.pdf.merge(&form.files).await.map_err(|e| match e {
        PdfMergeError::NoValidPages => AppError::upstream(e.to_string(), &e),
        other => AppError::upstream("Error merging PDF files.", other),
    })?;

    Ok(Json(MergePdfResponse {
        success: true,
        message: "PDFs merged successfully!".to_string(),
        download_url: merged.download_url,
        page_count: merged.page_count,
    }))
}
