use std::collections::HashMap;
use std::sync::Arc;

use support_core::models::ChatSession;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::AppError;
use crate::models::SessionRecord;

#[derive(Clone, Default)]
pub struct ChatRepository {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl ChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_by_id(&self, id: &str) -> Option<SessionRecord> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn save(&self, record: &SessionRecord) -> SessionRecord {
        debug!("Saving chat session {}", record.session.id);
        self.sessions
            .write()
            .await
            .insert(record.session.id.clone(), record.clone());
        record.clone()
    }

    /// Applies `change` under the write lock and returns the updated session.
    pub async fn update<F>(&self, id: &str, change: F) -> Result<ChatSession, AppError>
    where
        F: FnOnce(&mut ChatSession) -> Result<(), AppError>,
    {
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .get_mut(id)
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })?;
        change(&mut record.session)?;
        Ok(record.session.clone())
    }
}
