use std::rc::Rc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use urlencoding::encode;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::{ChatSession, SupportTicket};
use crate::ticket::TicketSubmission;
use crate::transport::{FilePart, MultipartForm, Transport};

/// Chat session calls. Every mutation is followed by a full reload; the
/// caller always receives the server's authoritative session.
pub struct ChatStore<T> {
    api: Rc<ApiClient<T>>,
}

impl<T: Transport> ChatStore<T> {
    pub fn new(api: Rc<ApiClient<T>>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Rc<ApiClient<T>> {
        &self.api
    }

    /// Creates a new session, or resumes `resume_id` when given.
    pub async fn create_session(&self, resume_id: Option<&str>) -> Result<ChatSession, ApiError> {
        let body = match resume_id {
            Some(id) => json!({ "sessionId": id }),
            None => json!({}),
        };
        let session: ChatSession = self
            .api
            .post_json("/api/chat/session", &body)
            .await?
            .payload()?;
        info!(session_id = %session.id, status = %session.status, "chat session ready");
        Ok(session)
    }

    pub async fn load_session(&self, session_id: &str) -> Result<ChatSession, ApiError> {
        self.api
            .get(&format!("/api/chat/session/{}", encode(session_id)))
            .await?
            .payload()
    }

    pub async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        attachment: Option<FilePart>,
    ) -> Result<ChatSession, ApiError> {
        let form = MultipartForm::new()
            .text("content", content)
            .maybe_file("attachment", attachment);
        self.api
            .post_form(&format!("/api/chat/message/{}", encode(session_id)), form)
            .await?;
        debug!(session_id, "message sent; reloading session");
        self.load_session(session_id).await
    }

    pub async fn close_session(&self, session_id: &str) -> Result<ChatSession, ApiError> {
        self.api
            .post_json(
                &format!("/api/chat/session/{}/close", encode(session_id)),
                &json!({}),
            )
            .await?;
        info!(session_id, "chat session closed");
        self.load_session(session_id).await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionReceipt {
    ticket_number: String,
}

/// Ticket calls. Like [`ChatStore`], comments trigger a refetch instead of a
/// local patch.
pub struct TicketStore<T> {
    api: Rc<ApiClient<T>>,
}

impl<T: Transport> TicketStore<T> {
    pub fn new(api: Rc<ApiClient<T>>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Rc<ApiClient<T>> {
        &self.api
    }

    /// Posts a validated submission. The server may answer with the full
    /// ticket or only its number; in the latter case the ticket is fetched.
    pub async fn submit_ticket(
        &self,
        submission: &TicketSubmission,
    ) -> Result<SupportTicket, ApiError> {
        let response = self
            .api
            .post_form("/api/forms/support", submission.to_form())
            .await?;
        if let Ok(ticket) = response.payload::<SupportTicket>() {
            info!(ticket_number = %ticket.ticket_number, "support ticket submitted");
            return Ok(ticket);
        }
        let receipt: SubmissionReceipt = response.payload()?;
        info!(ticket_number = %receipt.ticket_number, "support ticket submitted");
        self.fetch_ticket(&receipt.ticket_number)
            .await?
            .ok_or_else(|| ApiError::NotFound {
                path: format!("/api/forms/support/ticket/{}", receipt.ticket_number),
            })
    }

    /// `None` when the server has no such ticket.
    pub async fn fetch_ticket(&self, ticket_number: &str) -> Result<Option<SupportTicket>, ApiError> {
        let path = format!("/api/forms/support/ticket/{}", encode(ticket_number.trim()));
        match self.api.get(&path).await {
            Ok(response) => response.optional_payload(),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn add_ticket_comment(
        &self,
        ticket_number: &str,
        content: &str,
    ) -> Result<SupportTicket, ApiError> {
        let path = format!(
            "/api/forms/support/tickets/{}/comments",
            encode(ticket_number)
        );
        self.api
            .post_json(&path, &json!({ "content": content }))
            .await?;
        self.fetch_ticket(ticket_number)
            .await?
            .ok_or_else(|| ApiError::NotFound { path })
    }
}
