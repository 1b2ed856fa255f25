use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use support_core::models::{ChatSession, Message};
use support_core::validation::Field;

use crate::errors::AppError;
use crate::models::{CreateSessionRequest, CurrentUser, Envelope};
use crate::routes::form::read_form;
use crate::service::chat_service::ChatService;

/// POST `/api/chat/session` : no body, `{}` or `{ "sessionId": ... }` to resume
pub async fn open_session_handler(
    State(svc): State<ChatService>,
    CurrentUser(user): CurrentUser,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<Json<Envelope<ChatSession>>, AppError> {
    let resume_id = body.and_then(|Json(body)| body.session_id);
    let session = svc.open_session(&user, resume_id.as_deref()).await?;
    Ok(Json(Envelope::success(session)))
}

/// GET `/api/chat/session/{id}`
pub async fn get_session_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Result<Json<Envelope<ChatSession>>, AppError> {
    Ok(Json(Envelope::success(svc.get_session(&id).await?)))
}

/// POST `/api/chat/message/{id}` : multipart `content` and optional `attachment`
pub async fn post_message_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Envelope<Message>>), AppError> {
    let form = read_form(multipart).await?;
    let content = form.text(Field::Content.as_str()).to_string();
    let message = svc.post_message(&user, &id, &content, form.file).await?;
    Ok((StatusCode::CREATED, Json(Envelope::success(message))))
}

/// POST `/api/chat/session/{id}/close`
pub async fn close_session_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Envelope<ChatSession>>, AppError> {
    Ok(Json(Envelope::success(svc.close_session(&user, &id).await?)))
}
