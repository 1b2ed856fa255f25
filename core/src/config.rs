use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "http://localhost:3000";
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Where the user is sent when a mutating call fails in a way the page
/// cannot recover from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectPaths {
    pub session_expired: String,
    pub server_error: String,
    pub network_error: String,
}

impl Default for RedirectPaths {
    fn default() -> Self {
        Self {
            session_expired: "/login?expired=true".to_string(),
            server_error: "/error/server".to_string(),
            network_error: "/error/network".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportConfig {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub error_backoff_ms: u64,
    pub redirect_cooldown_ms: u64,
    pub max_attachment_bytes: usize,
    pub redirects: RedirectPaths,
    pub login_path: String,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            poll_interval_ms: 3_000,
            error_backoff_ms: 5_000,
            redirect_cooldown_ms: 5_000,
            max_attachment_bytes: MAX_ATTACHMENT_BYTES,
            redirects: RedirectPaths::default(),
            login_path: "/login".to_string(),
        }
    }
}

impl SupportConfig {
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Missing keys keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn redirect_cooldown(&self) -> Duration {
        Duration::from_millis(self.redirect_cooldown_ms)
    }
}
