use std::collections::HashMap;

use axum::extract::Multipart;
use support_core::transport::FilePart;
use tracing::debug;

use crate::errors::AppError;

const FILE_FIELD: &str = "attachment";

/// A `multipart/form-data` body split into text fields and the optional
/// `attachment` file.
#[derive(Debug, Default)]
pub struct FormInput {
    pub fields: HashMap<String, String>,
    pub file: Option<FilePart>,
}

impl FormInput {
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }
}

pub async fn read_form(mut multipart: Multipart) -> Result<FormInput, AppError> {
    let mut input = FormInput::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let filename = field.file_name().unwrap_or_default().to_string();
            let mime_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            if filename.is_empty() && bytes.is_empty() {
                continue;
            }
            debug!("Received attachment {filename} ({} bytes)", bytes.len());
            input.file = Some(FilePart::new(filename, mime_type, bytes.to_vec()));
        } else {
            let value = field.text().await?;
            input.fields.insert(name, value);
        }
    }
    Ok(input)
}
