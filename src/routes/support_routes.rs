use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use support_core::models::SupportTicket;

use crate::errors::AppError;
use crate::models::{CommentRequest, CurrentUser, Envelope, StatusUpdateRequest};
use crate::routes::form::read_form;
use crate::service::ticket_service::TicketService;

/// POST `/api/forms/support` : multipart ticket form
pub async fn submit_ticket_handler(
    State(svc): State<TicketService>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Envelope<SupportTicket>>), AppError> {
    let form = read_form(multipart).await?;
    let ticket = svc.submit(&user, &form.fields, form.file).await?;
    Ok((StatusCode::CREATED, Json(Envelope::success(ticket))))
}

/// GET `/api/forms/support/ticket/{ticket_number}`
pub async fn get_ticket_handler(
    Path(ticket_number): Path<String>,
    State(svc): State<TicketService>,
) -> Result<Json<Envelope<SupportTicket>>, AppError> {
    Ok(Json(Envelope::success(svc.get_ticket(&ticket_number).await?)))
}

/// POST `/api/forms/support/tickets/{ticket_number}/comments`
pub async fn add_comment_handler(
    Path(ticket_number): Path<String>,
    State(svc): State<TicketService>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CommentRequest>,
) -> Result<Json<Envelope<SupportTicket>>, AppError> {
    let ticket = svc.add_comment(&user, &ticket_number, &body.content).await?;
    Ok(Json(Envelope::success(ticket)))
}

/// PUT `/api/forms/support/tickets/{ticket_number}/status` : staff only
pub async fn update_status_handler(
    Path(ticket_number): Path<String>,
    State(svc): State<TicketService>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Envelope<SupportTicket>>, AppError> {
    let ticket = svc
        .update_status(&user, &ticket_number, &body.status)
        .await?;
    Ok(Json(Envelope::success(ticket)))
}
