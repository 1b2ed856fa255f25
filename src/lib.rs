//! Local development API for the support desk: cookie login, live chat
//! sessions, support tickets and attachment uploads, all held in memory.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod routes;
pub mod service;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::db::chat_repository::ChatRepository;
use crate::db::ticket_repository::TicketRepository;
use crate::db::upload_repository::UploadRepository;
use crate::db::user_repository::UserRepository;
use crate::service::auth_service::AuthService;
use crate::service::chat_service::ChatService;
use crate::service::ticket_service::TicketService;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub chat: ChatService,
    pub tickets: TicketService,
    pub uploads: UploadRepository,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let uploads = UploadRepository::new();
        Self {
            auth: AuthService::new(UserRepository::new()),
            chat: ChatService::new(ChatRepository::new(), uploads.clone(), config.max_upload_bytes),
            tickets: TicketService::new(
                TicketRepository::new(),
                uploads.clone(),
                config.max_upload_bytes,
            ),
            uploads,
        }
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for ChatService {
    fn from_ref(state: &AppState) -> Self {
        state.chat.clone()
    }
}

impl FromRef<AppState> for TicketService {
    fn from_ref(state: &AppState) -> Self {
        state.tickets.clone()
    }
}

impl FromRef<AppState> for UploadRepository {
    fn from_ref(state: &AppState) -> Self {
        state.uploads.clone()
    }
}

/// The full HTTP application: routes, CORS for the frontend origin (with
/// credentials), body limit and request tracing.
pub fn app(state: AppState, config: &ServerConfig) -> anyhow::Result<Router> {
    let origin: HeaderValue = config.frontend_origin.parse()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Ok(routes::router()
        .layer(DefaultBodyLimit::max(config.body_limit()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
