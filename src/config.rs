use std::env;

use support_core::config::MAX_ATTACHMENT_BYTES;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:8080";

/// Server settings, read from the environment (and `.env` in development).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Only origin allowed to call the API with credentials.
    pub frontend_origin: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
            max_upload_bytes: MAX_ATTACHMENT_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            frontend_origin: env::var("FRONTEND_ORIGIN").unwrap_or(defaults.frontend_origin),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
        }
    }

    /// Request body cap. Leaves room for the other multipart fields so an
    /// oversized file is rejected by our own size check with a clear message.
    pub fn body_limit(&self) -> usize {
        self.max_upload_bytes.saturating_mul(2).max(1024 * 1024)
    }
}
