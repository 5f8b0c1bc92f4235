use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub data: Bytes,
}

/// A drained multipart form: named files plus plain text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let filename = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("could not read field '{name}': {e}")))?;

            if filename.is_some() {
                form.files.insert(name, UploadedFile { filename, data });
            } else {
                let value = String::from_utf8(data.to_vec()).map_err(|_| {
                    AppError::Validation(format!("field '{name}' is not valid UTF-8"))
                })?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn field(&self, name: &str) -> Result<&str, AppError> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation(format!("missing form field '{name}'")))
    }

    pub fn take_file(&mut self, name: &str) -> Result<UploadedFile, AppError> {
        self.files
            .remove(name)
            .ok_or_else(|| AppError::Validation(format!("missing file field '{name}'")))
    }
}

/// Reduces a user-supplied name to a safe `*.pdf` download filename.
pub fn pdf_filename(requested: Option<&str>) -> String {
    let stem: String = requested
        .unwrap_or("contract")
        .trim()
        .trim_end_matches(".pdf")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "contract.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}
