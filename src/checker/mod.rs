//! Verification strategies.
//!
//! A [`Checker`] inspects a request and yields a [`CheckResult`]. Built-in
//! strategies:
//!
//! - [`TaskChecker`]: aggregates independently checked [`Task`]s
//!   (channel membership, bot started, custom predicate).
//! - [`SubGramChecker`] and [`FlyerChecker`]: delegate the decision to a
//!   remote sponsor service.
//!
//! # Failure asymmetry
//!
//! Service-backed checkers fail open when the remote answers with an error
//! status, and fail closed when the remote cannot be reached at all. The
//! task aggregator does neither: a task error aborts the whole check and is
//! resolved by the gate's policy.

mod flyer;
mod prompt;
mod service;
mod subgram;
mod task_checker;
pub mod tasks;

pub use flyer::FlyerChecker;
pub use prompt::{build_prompt, DefaultPrompter, Prompter};
pub use subgram::SubGramChecker;
pub use task_checker::TaskChecker;
pub use tasks::{BotTask, ChannelTask, CustomTask, Task};

use crate::context::RequestContext;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Outcome of a single check.
///
/// Produced fresh on every check and never mutated by the gate afterwards.
#[derive(Clone)]
pub struct CheckResult {
    /// The authoritative pass/fail bit.
    pub ok: bool,
    /// Unmet tasks when blocked, or all tasks (informational) when passed.
    pub tasks: Option<Vec<Arc<dyn Task>>>,
    /// Diagnostics only. Never used for control flow.
    pub meta: Map<String, Value>,
    /// Whether a pass may be persisted in the cross-request cache.
    pub cacheable: bool,
}

impl CheckResult {
    /// A verified pass.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            ok: true,
            tasks: None,
            meta: Map::new(),
            cacheable: true,
        }
    }

    /// A verified pass carrying the tasks that were checked.
    #[must_use]
    pub fn pass_with_tasks(tasks: Vec<Arc<dyn Task>>) -> Self {
        Self {
            tasks: Some(tasks),
            ..Self::pass()
        }
    }

    /// A pass granted because the upstream reported an error.
    ///
    /// Never cached: a degraded upstream must not pin a subject as verified.
    #[must_use]
    pub fn fail_open(meta: Map<String, Value>) -> Self {
        Self {
            ok: true,
            tasks: None,
            meta,
            cacheable: false,
        }
    }

    /// A block. `tasks` lists unmet tasks, or `None` when the subject is
    /// prompted out of band (or not at all).
    #[must_use]
    pub fn block(tasks: Option<Vec<Arc<dyn Task>>>) -> Self {
        Self {
            ok: false,
            tasks,
            meta: Map::new(),
            cacheable: false,
        }
    }

    /// Attach a diagnostic entry.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    /// Mark a pass as not cacheable.
    #[must_use]
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }

    /// Returns true when the gate may write the verified sentinel.
    #[must_use]
    pub fn should_cache(&self) -> bool {
        self.ok && self.cacheable
    }

    /// Targets of the carried tasks, in order.
    #[must_use]
    pub fn task_targets(&self) -> Vec<String> {
        self.tasks
            .as_ref()
            .map(|tasks| tasks.iter().map(|task| task.target()).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckResult")
            .field("ok", &self.ok)
            .field("tasks", &self.tasks.as_ref().map(|_| self.task_targets()))
            .field("meta", &self.meta)
            .field("cacheable", &self.cacheable)
            .finish()
    }
}

/// A verification strategy.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Short name used in logs and init errors.
    fn name(&self) -> &'static str;

    /// One-time initialization, run when the gate is built.
    ///
    /// # Errors
    ///
    /// Any error here makes the gate unusable.
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Decide whether the request may proceed.
    ///
    /// # Errors
    ///
    /// Errors are routed to the gate's error hook and resolved by its
    /// fail-open/fail-closed policy.
    async fn check(&self, ctx: &RequestContext) -> Result<CheckResult>;
}
