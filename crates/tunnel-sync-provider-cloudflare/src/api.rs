//! Cloudflare API v4 envelope handling and error mapping
//!
//! Every v4 response is wrapped in the same envelope:
//!
//! ```json
//! {
//!   "success": true,
//!   "errors": [],
//!   "messages": [],
//!   "result": { ... },
//!   "result_info": { "page": 1, "per_page": 100, "total_pages": 3 }
//! }
//! ```

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tunnel_sync_core::{Error, Result};

/// Backend name used in errors and logs
pub(crate) const BACKEND_NAME: &str = "cloudflare";

/// Which side of a run a call belongs to
///
/// Decides whether failures surface as [`Error::RemoteFetch`] or
/// [`Error::RemoteApply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Fetch,
    Apply,
}

impl CallKind {
    pub(crate) fn error(self, message: impl Into<String>) -> Error {
        match self {
            CallKind::Fetch => Error::remote_fetch(BACKEND_NAME, message),
            CallKind::Apply => Error::remote_apply(BACKEND_NAME, message),
        }
    }
}

/// Standard v4 response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

/// An entry of the `errors` array
#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// Pagination block of list responses
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ResultInfo {
    #[serde(default)]
    pub total_pages: u32,
}

impl<T> Envelope<T> {
    /// Fail when the API reported `success: false` despite a 2xx status
    pub(crate) fn ensure_success(self, kind: CallKind) -> Result<Self> {
        if self.success == Some(false) {
            return Err(kind.error(format!(
                "API reported failure: {}",
                join_messages(&self.errors)
            )));
        }
        Ok(self)
    }
}

/// Send a request and decode the v4 envelope
///
/// `what` names the resource for error messages. A 404 on a fetch call is
/// returned as [`Error::NotFound`] so callers can treat it as "empty".
pub(crate) async fn send<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    kind: CallKind,
    what: &str,
) -> Result<Envelope<T>> {
    let response = request
        .send()
        .await
        .map_err(|e| kind.error(format!("HTTP request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(status_error(kind, status, &error_text, what));
    }

    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| kind.error(format!("Failed to parse response: {}", e)))?;

    envelope.ensure_success(kind)
}

/// Map a non-2xx status to an error
pub(crate) fn status_error(
    kind: CallKind,
    status: reqwest::StatusCode,
    body: &str,
    what: &str,
) -> Error {
    let detail = error_detail(body);
    match status.as_u16() {
        404 if kind == CallKind::Fetch => Error::not_found(format!("{} not found", what)),
        401 | 403 => kind.error(format!(
            "Authentication failed: Invalid API token or insufficient permissions. Status: {} - {}",
            status, detail
        )),
        409 => kind.error(format!("Conflict updating {}: {} - {}", what, status, detail)),
        429 => kind.error(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => kind.error(format!(
            "Cloudflare server error (transient): {} - {}",
            status, detail
        )),
        _ => kind.error(format!("{} - {}", status, detail)),
    }
}

/// Extract a readable detail from an error body
///
/// Prefers the envelope's `errors[].message` entries and falls back to the
/// raw body text.
pub(crate) fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => join_messages(&envelope.errors),
        _ => body.trim().to_string(),
    }
}

fn join_messages(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| match e.code {
            Some(code) => format!("[{}] {}", code, e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
