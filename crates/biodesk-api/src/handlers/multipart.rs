//! Multipart form decoding shared by the record routes.

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

use biodesk_core::validation::FormFields;
use biodesk_core::{AttachmentSlot, UploadedFile};

use crate::error::BODY_TOO_LARGE;
use crate::ApiError;

/// A decoded multipart body: text fields plus files in attachment slots.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: FormFields,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    /// Remove and return the single file for `slot`, if sent.
    pub fn take_file(&mut self, slot: AttachmentSlot) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.slot == slot)?;
        Some(self.files.remove(index))
    }
}

fn upload_error(context: &str, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(BODY_TOO_LARGE.to_string())
    } else {
        ApiError::BadRequest(format!("{}: {}", context, err))
    }
}

/// Read every part of a multipart body.
///
/// Parts named after an attachment slot are files; everything else is text.
/// A slot part with no filename and no bytes (an untouched file input) is
/// ignored.
pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error("Failed to read upload", e))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match AttachmentSlot::from_field_name(&name) {
            Some(slot) => {
                let filename = field.file_name().map(str::to_string).unwrap_or_default();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| upload_error("Failed to read file data", e))?
                    .to_vec();

                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                let filename = if filename.is_empty() {
                    slot.as_str().to_string()
                } else {
                    filename
                };
                form.files.push(UploadedFile {
                    slot,
                    filename,
                    content_type,
                    data,
                });
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| upload_error(&format!("Failed to read field {}", name), e))?;
                form.fields.insert(name, text);
            }
        }
    }

    Ok(form)
}
