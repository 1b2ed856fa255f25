use chrono::Utc;
use support_core::models::{ChatSession, Message, Participant, SessionStatus};
use support_core::transport::FilePart;
use support_core::validation::check_attachment_size;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::chat_repository::ChatRepository;
use crate::db::upload_repository::UploadRepository;
use crate::errors::AppError;
use crate::models::{SessionRecord, StoredUpload};

const MAX_MESSAGE_LENGTH: usize = 8000;

#[derive(Clone)]
pub struct ChatService {
    chat_repo: ChatRepository,
    upload_repo: UploadRepository,
    max_upload_bytes: usize,
}

impl ChatService {
    pub fn new(chat_repo: ChatRepository, upload_repo: UploadRepository, max_upload_bytes: usize) -> Self {
        Self {
            chat_repo,
            upload_repo,
            max_upload_bytes,
        }
    }

    /// Resumes `resume_id` if it exists and belongs to `user`; otherwise
    /// starts a fresh session.
    pub async fn open_session(
        &self,
        user: &Participant,
        resume_id: Option<&str>,
    ) -> Result<ChatSession, AppError> {
        if let Some(id) = resume_id.map(str::trim).filter(|id| !id.is_empty()) {
            match self.chat_repo.find_by_id(id).await {
                Some(record) if record.owner_id == user.id || user.is_admin() => {
                    debug!("Resuming chat session {id}");
                    return Ok(record.session);
                }
                Some(_) => debug!("Session {id} belongs to someone else; starting a new one"),
                None => debug!("Session {id} not found; starting a new one"),
            }
        }

        let record = SessionRecord {
            owner_id: user.id.clone(),
            session: ChatSession {
                id: Uuid::new_v4().to_string(),
                status: SessionStatus::Initialized,
                messages: Vec::new(),
            },
        };
        let saved = self.chat_repo.save(&record).await;
        info!("Chat session {} opened by {}", saved.session.id, user.id);
        Ok(saved.session)
    }

    pub async fn get_session(&self, id: &str) -> Result<ChatSession, AppError> {
        self.chat_repo
            .find_by_id(id)
            .await
            .map(|record| record.session)
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })
    }

    pub async fn post_message(
        &self,
        user: &Participant,
        session_id: &str,
        content: &str,
        file: Option<FilePart>,
    ) -> Result<Message, AppError> {
        // ── Validation ────────────────────────────────────────────────────────
        let content = content.trim();
        if content.is_empty() && file.is_none() {
            return Err(AppError::EmptyField {
                field_name: "content".to_string(),
            });
        }
        if content.len() > MAX_MESSAGE_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "content".to_string(),
                max_length: MAX_MESSAGE_LENGTH,
                actual_length: content.len(),
            });
        }
        if let Some(file) = &file {
            check_attachment_size(file.size(), self.max_upload_bytes)?;
        }
        let record = self
            .chat_repo
            .find_by_id(session_id)
            .await
            .ok_or_else(|| AppError::SessionNotFound {
                id: session_id.to_string(),
            })?;
        if record.owner_id != user.id && !user.is_admin() {
            return Err(AppError::Forbidden {
                action: "write in another customer's chat",
            });
        }
        if record.session.is_closed() {
            return Err(AppError::SessionClosed {
                id: session_id.to_string(),
            });
        }

        // ── Persist attachment, then the message ─────────────────────────────
        let attachment = match file {
            Some(file) => {
                let upload = StoredUpload::new(file.filename, file.mime_type, file.bytes);
                Some(self.upload_repo.save(upload).await.attachment())
            }
            None => None,
        };
        let message = Message {
            id: Some(Uuid::new_v4().to_string()),
            sender: user.clone(),
            content: content.to_string(),
            attachment,
            timestamp: Utc::now(),
        };

        let stored = message.clone();
        let session = self
            .chat_repo
            .update(session_id, move |session| {
                if session.is_closed() {
                    return Err(AppError::SessionClosed {
                        id: session.id.clone(),
                    });
                }
                session.status = next_status(session.status, &stored.sender);
                session.messages.push(stored);
                Ok(())
            })
            .await?;
        debug!(
            "Message added to session {session_id}; status is now {}",
            session.status
        );
        Ok(message)
    }

    pub async fn close_session(&self, user: &Participant, session_id: &str) -> Result<ChatSession, AppError> {
        let record = self
            .chat_repo
            .find_by_id(session_id)
            .await
            .ok_or_else(|| AppError::SessionNotFound {
                id: session_id.to_string(),
            })?;
        if record.owner_id != user.id && !user.is_admin() {
            return Err(AppError::Forbidden {
                action: "close another customer's chat",
            });
        }
        let session = self
            .chat_repo
            .update(session_id, |session| {
                session.status = SessionStatus::Closed;
                Ok(())
            })
            .await?;
        info!("Chat session {session_id} closed by {}", user.id);
        Ok(session)
    }
}

/// `initialized → waiting` on the first customer message, `→ active` once
/// support replies. Closed sessions never reopen.
fn next_status(current: SessionStatus, sender: &Participant) -> SessionStatus {
    match (current, sender.is_admin()) {
        (SessionStatus::Closed, _) => SessionStatus::Closed,
        (SessionStatus::Initialized | SessionStatus::Waiting, true) => SessionStatus::Active,
        (SessionStatus::Initialized, false) => SessionStatus::Waiting,
        (status, _) => status,
    }
}
