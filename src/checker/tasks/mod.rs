//! Independently checkable conditions.
//!
//! Every task has a destination the subject is sent to and a completion
//! predicate. `resolve` runs once when the task is added to a
//! [`TaskChecker`](crate::checker::TaskChecker); `check` may run many times
//! and never mutates the task.

mod bot;
mod channel;
mod custom;

pub use bot::BotTask;
pub use channel::ChannelTask;
pub use custom::{ButtonFn, CheckFn, CustomTask};

use crate::context::RequestContext;
use crate::error::Result;
use crate::platform::PlatformApi;
use async_trait::async_trait;

/// A single condition gating the subject.
#[async_trait]
pub trait Task: Send + Sync {
    /// Destination URL, or the raw identifier while unresolved.
    fn target(&self) -> String;

    /// Returns true once `target` is a concrete URL.
    fn is_resolved(&self) -> bool {
        true
    }

    /// Turn an identifier into a concrete URL. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`](crate::Error::Resolution) when no URL can
    /// be derived.
    async fn resolve(&self, _api: Option<&dyn PlatformApi>) -> Result<()> {
        Ok(())
    }

    /// Query whether the request's subject has completed the task.
    ///
    /// # Errors
    ///
    /// Errors are not caught by the aggregator; they fail the whole check.
    async fn check(&self, ctx: &RequestContext) -> Result<bool>;

    /// Label for the prompt button.
    fn button(&self, ctx: &RequestContext) -> String;

    /// Show the task in prompts even when completed. Never blocks once completed.
    fn always_show(&self) -> bool {
        false
    }
}
