use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use support_core::validation::{FieldErrors, ValidationError};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    // ── Auth errors ──────────────────────────────────────────────────────────
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Only support staff can {action}")]
    Forbidden { action: &'static str },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong {
        field_name: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("{}", first_message(.0))]
    InvalidForm(FieldErrors),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unknown ticket status '{value}'")]
    UnknownStatus { value: String },

    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    #[error("Request body is too large")]
    BodyTooLarge,

    // ── Lookup errors ────────────────────────────────────────────────────────
    #[error("Chat session '{id}' not found")]
    SessionNotFound { id: String },

    #[error("Ticket {ticket_number} not found")]
    TicketNotFound { ticket_number: String },

    #[error("Upload '{id}' not found")]
    UploadNotFound { id: String },

    // ── State errors ─────────────────────────────────────────────────────────
    #[error("Chat session '{id}' is closed")]
    SessionClosed { id: String },

    #[error("Ticket {ticket_number} is closed")]
    TicketClosed { ticket_number: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

fn first_message(errors: &FieldErrors) -> String {
    errors
        .iter()
        .next()
        .map(|(_, err)| err.to_string())
        .unwrap_or_else(|| "Invalid form".to_string())
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::SessionNotFound { .. }
                | AppError::TicketNotFound { .. }
                | AppError::UploadNotFound { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyField { .. }
                | AppError::FieldTooLong { .. }
                | AppError::InvalidForm(_)
                | AppError::Validation(_)
                | AppError::UnknownStatus { .. }
                | AppError::Multipart(_)
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::NotAuthenticated)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::BodyTooLarge | AppError::Validation(ValidationError::FileTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            AppError::SessionClosed { .. } | AppError::TicketClosed { .. } => StatusCode::CONFLICT,
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::BodyTooLarge
        } else {
            AppError::Multipart(err.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }
        let mut body = json!({
            "status": "error",
            "message": self.to_string(),
        });
        if let AppError::InvalidForm(errors) = &self {
            let fields: Map<String, Value> = errors
                .iter()
                .map(|(field, err)| (field.as_str().to_string(), Value::from(err.to_string())))
                .collect();
            body["errors"] = Value::Object(fields);
        }
        (status, Json(body)).into_response()
    }
}
