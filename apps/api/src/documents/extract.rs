use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extracts the text layer of an uploaded PDF.
///
/// Parsing runs on the blocking pool: pdf-extract is CPU-bound and can panic on
/// malformed input, which surfaces here as a join error instead of taking down a worker.
pub async fn extract_pdf_text(data: Bytes) -> Result<String, AppError> {
    if data.is_empty() {
        return Err(AppError::Pdf("uploaded file is empty".to_string()));
    }
    if !data.starts_with(PDF_MAGIC) {
        return Err(AppError::Pdf("uploaded file is not a PDF".to_string()));
    }

    let size = data.len();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
        .await
        .map_err(|e| AppError::Pdf(format!("PDF parser aborted: {e}")))?
        .map_err(|e| AppError::Pdf(format!("could not extract text: {e}")))?;

    debug!("Extracted {} chars from {} byte PDF", text.len(), size);

    if text.trim().is_empty() {
        return Err(AppError::Pdf(
            "PDF has no extractable text layer (scanned documents are not supported)".to_string(),
        ));
    }
    Ok(text)
}
