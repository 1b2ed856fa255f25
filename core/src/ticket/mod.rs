//! Ticket submission and follow-up.

mod tracker;
mod wizard;

use tracing::debug;
use urlencoding::encode;

use crate::api::ApiClient;
use crate::models::Participant;
use crate::transport::Transport;

pub use tracker::{CommentOutcome, TicketTracker};
pub use wizard::{TicketDraft, TicketSubmission, TicketWizard, WizardStep};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(Participant),
    Anonymous,
}

/// Asks the API who the current user is. Any failure counts as anonymous.
pub async fn check_identity<T: Transport>(api: &ApiClient<T>) -> Identity {
    let user = match api.get("/api/auth/me").await {
        Ok(response) => response.payload::<Participant>(),
        Err(err) => Err(err),
    };
    match user {
        Ok(user) => Identity::Authenticated(user),
        Err(err) => {
            debug!(error = %err, "identity check failed; treating as anonymous");
            Identity::Anonymous
        }
    }
}

/// Login URL that brings the user back to `return_path` afterwards.
pub fn login_redirect(login_path: &str, return_path: &str) -> String {
    format!("{login_path}?redirect={}", encode(return_path))
}

/// Route of the status view for a submitted ticket.
pub fn status_path(ticket_number: &str) -> String {
    format!("/support/ticket/{}", encode(ticket_number))
}
