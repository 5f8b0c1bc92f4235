//! Axum route handlers for the Documents API.

use axum::{
    extract::Multipart,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::documents::extract::extract_pdf_text;
use crate::documents::normalize::normalize;
use crate::documents::render::render_pdf;
use crate::documents::upload::{pdf_filename, UploadForm};
use crate::errors::AppError;

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub filename: Option<String>,
    pub text: String,
    pub char_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub text: String,
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub normalized: String,
}

/// POST /api/v1/documents/extract
///
/// Multipart upload with a `file` field holding a PDF. Returns its text layer.
pub async fn handle_extract(multipart: Multipart) -> Result<Json<ExtractResponse>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file("file")?;
    let text = extract_pdf_text(file.data).await?;
    info!(
        "Extracted {} chars from {:?}",
        text.chars().count(),
        file.filename
    );
    Ok(Json(ExtractResponse {
        filename: file.filename,
        char_count: text.chars().count(),
        text,
    }))
}

/// POST /api/v1/documents/render
///
/// Renders a text blob to a downloadable PDF attachment.
pub async fn handle_render(Json(request): Json<RenderRequest>) -> Result<impl IntoResponse, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let filename = pdf_filename(request.filename.as_deref());
    let title = filename.trim_end_matches(".pdf").to_string();
    let text = request.text;
    let pdf = tokio::task::spawn_blocking(move || render_pdf(&text, &title))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        pdf,
    ))
}

/// POST /api/v1/documents/normalize
pub async fn handle_normalize(Json(request): Json<NormalizeRequest>) -> Json<NormalizeResponse> {
    Json(NormalizeResponse {
        normalized: normalize(&request.text),
    })
}
