use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::SupportConfig;
use crate::error::ApiError;
use crate::redirect::{Clock, Navigator, RedirectGuard, RedirectTarget, Redirector};
use crate::transport::{ApiRequest, Method, MultipartForm, RawResponse, RequestBody, Transport};

/// Single egress point for calls to the support API.
///
/// Mutating calls (anything but GET) that fail with 401, 5xx or no response
/// at all navigate away from the page through the shared [`Redirector`];
/// the caller then gets an [`ApiError::Redirected`] and should not render
/// any error UI of its own. GET failures are always returned as-is.
pub struct ApiClient<T> {
    transport: T,
    base_url: String,
    redirector: Redirector,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(
        transport: T,
        config: &SupportConfig,
        navigator: Rc<dyn Navigator>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let guard = RedirectGuard::new(clock, config.redirect_cooldown());
        let redirector = Redirector::new(guard, navigator, config.redirects.clone());
        Self::with_redirector(transport, &config.api_base_url, redirector)
    }

    pub fn with_redirector(transport: T, base_url: &str, redirector: Redirector) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            redirector,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn redirector(&self) -> &Redirector {
        &self.redirector
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest {
            method,
            url: self.url(path),
            body,
        };
        debug!(%method, path, "api request");

        let raw = match self.transport.send(request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%method, path, error = %err, "api request got no response");
                return Err(self.classify(method, Some(RedirectTarget::NetworkError), err.into()));
            }
        };

        if raw.is_success() {
            return Ok(ApiResponse::from(raw));
        }

        let message = error_message(&raw.body).unwrap_or_default();
        warn!(%method, path, status = raw.status, %message, "api request failed");
        let (target, cause) = match raw.status {
            401 => (Some(RedirectTarget::SessionExpired), ApiError::Unauthorized),
            404 => (
                None,
                ApiError::NotFound {
                    path: path.to_string(),
                },
            ),
            status => (
                (status >= 500).then_some(RedirectTarget::ServerError),
                ApiError::Status { status, message },
            ),
        };
        Err(self.classify(method, target, cause))
    }

    fn classify(&self, method: Method, target: Option<RedirectTarget>, cause: ApiError) -> ApiError {
        match target {
            Some(target) if method.is_mutating() => {
                let issued = self.redirector.redirect(target);
                ApiError::Redirected {
                    target,
                    issued,
                    cause: Box::new(cause),
                }
            }
            _ => cause,
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.request(Method::Get, path, RequestBody::Empty).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.request(Method::Post, path, RequestBody::Json(body)).await
    }

    pub async fn post_form(&self, path: &str, form: MultipartForm) -> Result<ApiResponse, ApiError> {
        self.request(Method::Post, path, RequestBody::Multipart(form))
            .await
    }
}

/// Successful response body, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: u16,
    body: String,
}

impl From<RawResponse> for ApiResponse {
    fn from(raw: RawResponse) -> Self {
        Self {
            status: raw.status,
            body: raw.body,
        }
    }
}

impl ApiResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Decodes the payload, which is either wrapped in a `data` field or is
    /// the body itself.
    pub fn payload<P: DeserializeOwned>(&self) -> Result<P, ApiError> {
        let value: Value =
            serde_json::from_str(&self.body).map_err(|e| ApiError::Decode(e.to_string()))?;
        decode_envelope(value)
    }

    /// Like [`payload`](Self::payload) but an empty body, `null`, or a null
    /// `data` field yields `None`.
    pub fn optional_payload<P: DeserializeOwned>(&self) -> Result<Option<P>, ApiError> {
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        let value: Value =
            serde_json::from_str(&self.body).map_err(|e| ApiError::Decode(e.to_string()))?;
        match &value {
            Value::Null => Ok(None),
            Value::Object(map) if map.get("data").is_some_and(Value::is_null) => Ok(None),
            _ => decode_envelope(value).map(Some),
        }
    }
}

fn decode_envelope<P: DeserializeOwned>(value: Value) -> Result<P, ApiError> {
    if let Some(data) = value.get("data").filter(|data| !data.is_null()) {
        if let Ok(payload) = P::deserialize(data) {
            return Ok(payload);
        }
    }
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// `message` or `error` from a JSON error body, or the raw text if short.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(parsed) => parsed.message.or(parsed.error),
        Err(_) if trimmed.len() <= 200 && !trimmed.starts_with('<') => Some(trimmed.to_string()),
        Err(_) => None,
    }
}
