use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::models::StoredUpload;

#[derive(Clone, Default)]
pub struct UploadRepository {
    uploads: Arc<RwLock<HashMap<String, StoredUpload>>>,
}

impl UploadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_by_id(&self, id: &str) -> Option<StoredUpload> {
        self.uploads.read().await.get(id).cloned()
    }

    pub async fn save(&self, upload: StoredUpload) -> StoredUpload {
        debug!(
            "Storing upload {} ({}, {} bytes)",
            upload.id,
            upload.filename,
            upload.bytes.len()
        );
        self.uploads
            .write()
            .await
            .insert(upload.id.clone(), upload.clone());
        upload
    }
}
