use thiserror::Error;

use crate::redirect::RedirectTarget;
use crate::transport::TransportError;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ApiError {
    // ── Handled by navigation ────────────────────────────────────────────────
    #[error("request failed and the page was sent to {target:?}: {cause}")]
    Redirected {
        target: RedirectTarget,
        /// False when the redirect guard swallowed a duplicate navigation.
        issued: bool,
        #[source]
        cause: Box<ApiError>,
    },

    // ── Left to the caller ───────────────────────────────────────────────────
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Unexpected response payload: {0}")]
    Decode(String),
}

impl ApiError {
    /// A redirect has been issued (or was already pending); no further
    /// user-facing error UI is needed.
    pub fn is_handled(&self) -> bool {
        matches!(self, ApiError::Redirected { .. })
    }

    /// Looks through a redirect at the failure that caused it.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::Redirected { cause, .. } => cause.is_not_found(),
            other => matches!(other, ApiError::NotFound { .. }),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        match self {
            ApiError::Redirected { cause, .. } => cause.is_unauthorized(),
            other => matches!(other, ApiError::Unauthorized),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Redirected { cause, .. } => cause.status(),
            ApiError::Unauthorized => Some(401),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(_) | ApiError::Decode(_) => None,
        }
    }

    /// Message suitable for an inline banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Network(_) => "Could not reach the support service".to_string(),
            ApiError::Unauthorized => "Please log in to continue".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ChatError {
    pub fn is_handled(&self) -> bool {
        matches!(self, ChatError::Api(err) if err.is_handled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirected(cause: ApiError) -> ApiError {
        ApiError::Redirected {
            target: RedirectTarget::SessionExpired,
            issued: false,
            cause: Box::new(cause),
        }
    }

    #[test]
    fn predicates_see_through_redirects() {
        let err = redirected(ApiError::Unauthorized);
        assert!(err.is_handled());
        assert!(err.is_unauthorized());
        assert!(!err.is_not_found());
        assert_eq!(err.status(), Some(401));

        let err = redirected(ApiError::NotFound {
            path: "/api/x".to_string(),
        });
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn oversized_attachment_is_a_chat_validation_error() {
        let err: ChatError = ValidationError::FileTooLarge { size: 10, limit: 5 }.into();
        assert!(matches!(err, ChatError::Validation(_)));
        assert!(!err.is_handled());
    }
}
