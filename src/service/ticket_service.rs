use std::collections::HashMap;

use chrono::Utc;
use support_core::models::{Comment, Participant, SupportTicket, TicketStatus};
use support_core::ticket::TicketDraft;
use support_core::transport::FilePart;
use support_core::validation::{check_attachment_size, Field};
use tracing::info;

use crate::db::ticket_repository::TicketRepository;
use crate::db::upload_repository::UploadRepository;
use crate::errors::AppError;
use crate::models::{StoredUpload, TicketRecord};

const MAX_COMMENT_LENGTH: usize = 8000;

#[derive(Clone)]
pub struct TicketService {
    ticket_repo: TicketRepository,
    upload_repo: UploadRepository,
    max_upload_bytes: usize,
}

impl TicketService {
    pub fn new(
        ticket_repo: TicketRepository,
        upload_repo: UploadRepository,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            ticket_repo,
            upload_repo,
            max_upload_bytes,
        }
    }

    /// Validates the submitted form fields the same way the client wizard
    /// does, then files the ticket as `open`.
    pub async fn submit(
        &self,
        user: &Participant,
        fields: &HashMap<String, String>,
        file: Option<FilePart>,
    ) -> Result<SupportTicket, AppError> {
        if let Some(file) = &file {
            check_attachment_size(file.size(), self.max_upload_bytes)?;
        }
        let field = |field: Field| fields.get(field.as_str()).cloned().unwrap_or_default();
        let draft = TicketDraft {
            issue_category: field(Field::IssueCategory),
            issue_title: field(Field::IssueTitle),
            priority: field(Field::Priority),
            description: field(Field::Description),
            steps_to_reproduce: fields.get("stepsToReproduce").cloned().unwrap_or_default(),
            attachment: None,
        };
        let submission = draft
            .submission()
            .map_err(|(_, errors)| AppError::InvalidForm(errors))?;

        let attachment = match file {
            Some(file) => {
                let upload = StoredUpload::new(file.filename, file.mime_type, file.bytes);
                Some(self.upload_repo.save(upload).await.attachment())
            }
            None => None,
        };

        let now = Utc::now();
        let ticket = SupportTicket {
            ticket_number: self.ticket_repo.next_ticket_number(),
            issue_category: submission.issue_category,
            issue_title: submission.issue_title,
            description: submission.description,
            steps_to_reproduce: submission.steps_to_reproduce,
            priority: submission.priority,
            status: TicketStatus::Open,
            attachment,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let saved = self
            .ticket_repo
            .save(&TicketRecord {
                owner_id: user.id.clone(),
                ticket,
            })
            .await;
        info!(
            "Ticket {} filed by {} ({} priority)",
            saved.ticket_number, user.id, saved.priority
        );
        Ok(saved)
    }

    pub async fn get_ticket(&self, ticket_number: &str) -> Result<SupportTicket, AppError> {
        self.ticket_repo
            .find_by_number(ticket_number)
            .await
            .map(|record| record.ticket)
            .ok_or_else(|| AppError::TicketNotFound {
                ticket_number: ticket_number.to_string(),
            })
    }

    pub async fn add_comment(
        &self,
        user: &Participant,
        ticket_number: &str,
        content: &str,
    ) -> Result<SupportTicket, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::EmptyField {
                field_name: "content".to_string(),
            });
        }
        if content.len() > MAX_COMMENT_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "content".to_string(),
                max_length: MAX_COMMENT_LENGTH,
                actual_length: content.len(),
            });
        }

        let owner_id = self
            .ticket_repo
            .find_by_number(ticket_number)
            .await
            .map(|record| record.owner_id)
            .ok_or_else(|| AppError::TicketNotFound {
                ticket_number: ticket_number.to_string(),
            })?;
        if owner_id != user.id && !user.is_admin() {
            return Err(AppError::Forbidden {
                action: "comment on another customer's ticket",
            });
        }

        let comment = Comment {
            content: content.to_string(),
            created_at: Utc::now(),
            user: user.clone(),
        };
        self.ticket_repo
            .update(ticket_number, move |ticket| {
                if ticket.status.is_terminal() {
                    return Err(AppError::TicketClosed {
                        ticket_number: ticket.ticket_number.clone(),
                    });
                }
                ticket.updated_at = comment.created_at;
                ticket.comments.push(comment);
                Ok(())
            })
            .await
    }

    /// Staff only.
    pub async fn update_status(
        &self,
        user: &Participant,
        ticket_number: &str,
        status: &str,
    ) -> Result<SupportTicket, AppError> {
        if !user.is_admin() {
            return Err(AppError::Forbidden {
                action: "change a ticket's status",
            });
        }
        let status: TicketStatus = status.parse().map_err(|_| AppError::UnknownStatus {
            value: status.to_string(),
        })?;
        let ticket = self
            .ticket_repo
            .update(ticket_number, |ticket| {
                ticket.status = status;
                ticket.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        info!("Ticket {ticket_number} moved to {status} by {}", user.id);
        Ok(ticket)
    }
}
