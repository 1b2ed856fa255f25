use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::db::upload_repository::UploadRepository;
use crate::errors::AppError;

/// GET `/uploads/{id}` : serves a stored attachment inline
pub async fn get_upload_handler(
    Path(id): Path<String>,
    State(uploads): State<UploadRepository>,
) -> Result<Response, AppError> {
    let upload = uploads
        .find_by_id(&id)
        .await
        .ok_or_else(|| AppError::UploadNotFound { id: id.clone() })?;

    let content_type = HeaderValue::from_str(&upload.mime_type)
        .map_err(|e| AppError::Unexpected(format!("Bad mime type for upload {id}: {e}")))?;
    let filename = upload.filename.replace('"', "");
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        upload.bytes,
    )
        .into_response())
}
