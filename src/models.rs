use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use support_core::models::{Attachment, ChatSession, Participant, Role, SupportTicket};

/// Wraps every successful payload as `{ "status": "success", "data": ... }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

/// A chat session plus who started it.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub owner_id: String,
    pub session: ChatSession,
}

#[derive(Debug, Clone)]
pub struct TicketRecord {
    pub owner_id: String,
    pub ticket: SupportTicket,
}

/// Uploaded file kept in memory until the server stops.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub uploaded_at: DateTime<Utc>,
}

impl StoredUpload {
    pub fn new(filename: String, mime_type: String, bytes: Vec<u8>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename,
            mime_type,
            bytes,
            uploaded_at: Utc::now(),
        }
    }

    pub fn attachment(&self) -> Attachment {
        Attachment {
            filename: self.filename.clone(),
            path: format!("/uploads/{}", self.id),
            mime_type: self.mime_type.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// Who is making a request, resolved from the session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Participant);
