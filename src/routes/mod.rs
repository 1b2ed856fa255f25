pub mod auth_routes;
pub mod chat_routes;
pub mod form;
pub mod session;
pub mod support_routes;
pub mod upload_routes;

use axum::routing::{get, post, put};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Identity
        .route("/api/auth/login", post(auth_routes::login_handler))
        .route("/api/auth/logout", post(auth_routes::logout_handler))
        .route("/api/auth/me", get(auth_routes::me_handler))
        // Live chat
        .route("/api/chat/session", post(chat_routes::open_session_handler))
        .route("/api/chat/session/{id}", get(chat_routes::get_session_handler))
        .route(
            "/api/chat/session/{id}/close",
            post(chat_routes::close_session_handler),
        )
        .route("/api/chat/message/{id}", post(chat_routes::post_message_handler))
        // Support tickets
        .route("/api/forms/support", post(support_routes::submit_ticket_handler))
        .route(
            "/api/forms/support/ticket/{ticket_number}",
            get(support_routes::get_ticket_handler),
        )
        .route(
            "/api/forms/support/tickets/{ticket_number}/comments",
            post(support_routes::add_comment_handler),
        )
        .route(
            "/api/forms/support/tickets/{ticket_number}/status",
            put(support_routes::update_status_handler),
        )
        // Attachments
        .route("/uploads/{id}", get(upload_routes::get_upload_handler))
}
