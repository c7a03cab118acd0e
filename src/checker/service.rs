//! Shared HTTP plumbing for sponsor-service checkers.

use crate::checker::CheckResult;
use crate::error::{Error, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

/// How the API credential is delivered.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Credential {
    /// As a request header with this name.
    Header(&'static str),
    /// As a top-level JSON field with this name.
    JsonField(&'static str),
}

/// A reply from the remote service.
#[derive(Debug, Clone)]
pub(crate) struct ServiceReply {
    /// HTTP status.
    pub status: StatusCode,
    /// JSON body, or a synthesized error object when the body was not JSON.
    pub body: Value,
    /// False when `body` was synthesized.
    pub parsed: bool,
}

impl ServiceReply {
    /// String field of the body, ignoring empty strings.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.body
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Bounded-timeout JSON POST client for one remote service.
pub(crate) struct ServiceClient {
    http: Client,
    base_url: String,
    key: String,
    credential: Credential,
}

impl ServiceClient {
    /// Build a client. The timeout covers the whole request.
    pub fn new(
        base_url: &str,
        key: &str,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            credential,
        })
    }

    /// POST `payload` to `path`.
    ///
    /// Non-success replies with a non-JSON body come back as a synthesized
    /// `{"status": "error", "code": <http status>, "error": <body>}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on network failure or timeout, and
    /// [`Error::Verification`] when a success reply is not JSON.
    pub async fn post(&self, path: &str, mut payload: Map<String, Value>) -> Result<ServiceReply> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.http.post(&url);
        match self.credential {
            Credential::Header(name) => request = request.header(name, &self.key),
            Credential::JsonField(name) => {
                payload.insert(name.to_string(), Value::String(self.key.clone()));
            }
        }
        if !payload.is_empty() {
            request = request.json(&payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!("POST {url} -> {status}");

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(ServiceReply {
                status,
                body,
                parsed: true,
            }),
            Err(_) if !status.is_success() => Ok(ServiceReply {
                status,
                body: json!({
                    "status": "error",
                    "code": status.as_u16(),
                    "error": text,
                }),
                parsed: false,
            }),
            Err(e) => Err(Error::Verification(format!(
                "malformed reply from {url}: {e}"
            ))),
        }
    }
}

/// Outcome when the service could not be reached or answered garbage.
///
/// Fails closed, unlike well-formed error replies which fail open: a
/// reachable service is trusted to report its own failure, an unreachable
/// one is not. No tasks are attached, so nothing is prompted.
pub(crate) fn unreachable(service: &str, error: &Error) -> CheckResult {
    CheckResult::block(None)
        .with_meta("error", format!("{service}_request_failed"))
        .with_meta("details", error.to_string())
}
