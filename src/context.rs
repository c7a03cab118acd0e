//! Per-request context passed through the gate.

use crate::checker::CheckResult;
use crate::gate::Gate;
use crate::platform::PlatformApi;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The end user whose access is being gated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    /// Stable platform identifier.
    pub id: i64,
    /// First name, if known.
    pub first_name: Option<String>,
    /// Public username, if any.
    pub username: Option<String>,
    /// IETF-ish language tag reported by the client (`en`, `pt_BR`, ...).
    pub language_code: Option<String>,
    /// Premium flag, if the platform reports one.
    pub is_premium: Option<bool>,
}

impl Subject {
    /// Create a subject with only an identifier.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Set the language tag.
    #[must_use]
    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }

    /// Set the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the first name.
    #[must_use]
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }
}

/// Context for a single incoming request.
///
/// Holds the request-local verification outcome. It lives only as long as
/// the request and is never shared across requests.
#[derive(Default)]
pub struct RequestContext {
    subject: Option<Subject>,
    chat_id: Option<i64>,
    api: Option<Arc<dyn PlatformApi>>,
    pub(crate) verification: Option<CheckResult>,
    pub(crate) gate: Option<Arc<Gate>>,
}

impl RequestContext {
    /// Create an anonymous request with no subject, chat or platform context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request on behalf of a subject.
    #[must_use]
    pub fn for_subject(subject: Subject) -> Self {
        Self {
            subject: Some(subject),
            ..Self::default()
        }
    }

    /// Attach the chat the request originated from.
    #[must_use]
    pub fn with_chat(mut self, chat_id: i64) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    /// Attach the privileged lookup context.
    #[must_use]
    pub fn with_api(mut self, api: Arc<dyn PlatformApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// The subject, if the request has one.
    #[must_use]
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    /// The originating chat, if known.
    #[must_use]
    pub fn chat_id(&self) -> Option<i64> {
        self.chat_id
    }

    /// The privileged lookup context, if injected.
    #[must_use]
    pub fn api(&self) -> Option<&dyn PlatformApi> {
        self.api.as_deref()
    }

    /// The subject's language tag, if known.
    #[must_use]
    pub fn language_code(&self) -> Option<&str> {
        self.subject.as_ref()?.language_code.as_deref()
    }

    /// The verification outcome recorded for this request, if any.
    #[must_use]
    pub fn verification(&self) -> Option<&CheckResult> {
        self.verification.as_ref()
    }

    /// Returns true once a gate has been attached by [`Gate::handle`].
    #[must_use]
    pub fn is_gated(&self) -> bool {
        self.gate.is_some()
    }

    /// Run verification through the attached gate.
    ///
    /// Never fails: errors are resolved by the gate's fail-open/fail-closed
    /// policy. Without an attached gate there is nothing to enforce.
    pub async fn verify_tasks(&mut self) -> bool {
        let Some(gate) = self.gate.clone() else {
            debug!("verify_tasks called without an attached gate");
            return true;
        };
        gate.verify_tasks(self).await
    }

    /// Like [`verify_tasks`](Self::verify_tasks), running `on_verified`
    /// only when the subject is let through.
    pub async fn verify_tasks_with<F>(&mut self, on_verified: F) -> bool
    where
        F: FnOnce(&Self),
    {
        let ok = self.verify_tasks().await;
        if ok {
            on_verified(self);
        }
        ok
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("subject", &self.subject)
            .field("chat_id", &self.chat_id)
            .field("has_api", &self.api.is_some())
            .field("verification", &self.verification)
            .field("gated", &self.gate.is_some())
            .finish()
    }
}
