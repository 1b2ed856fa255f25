//! Client core for the support desk: chat sessions, ticket submission and
//! the polling loop that keeps both in sync with the support API.
//!
//! Nothing in here touches the network, the browser or a runtime directly.
//! Those are plugged in through [`transport::Transport`],
//! [`redirect::Navigator`], [`redirect::Clock`], [`polling::Sleeper`] and
//! [`polling::LocalSpawner`].

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod focus;
pub mod models;
pub mod polling;
pub mod redirect;
pub mod snapshot;
pub mod store;
pub mod ticket;
pub mod transport;
pub mod validation;

pub use api::{ApiClient, ApiResponse};
pub use config::SupportConfig;
pub use error::{ApiError, ChatError};
pub use models::{
    Attachment, ChatSession, Comment, Message, Participant, Priority, Role, SessionStatus,
    SupportTicket, TicketStatus,
};
