use std::collections::HashMap;
use std::sync::Arc;

use support_core::models::Participant;
use tokio::sync::RwLock;
use tracing::debug;

/// Login tokens (the `support_session` cookie value) mapped to their user.
#[derive(Clone, Default)]
pub struct UserRepository {
    sessions: Arc<RwLock<HashMap<String, Participant>>>,
}

impl UserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_by_token(&self, token: &str) -> Option<Participant> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn save(&self, token: &str, user: &Participant) {
        debug!("Storing login for user {}", user.id);
        self.sessions
            .write()
            .await
            .insert(token.to_string(), user.clone());
    }

    pub async fn delete(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}
