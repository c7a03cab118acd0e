//! Multi-task aggregator.

use crate::checker::prompt::{DefaultPrompter, Prompter};
use crate::checker::tasks::Task;
use crate::checker::{CheckResult, Checker};
use crate::context::RequestContext;
use crate::error::Result;
use crate::platform::PlatformApi;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// Gates a subject behind every configured task.
///
/// Tasks are checked concurrently. A task error is not caught here: it
/// fails the whole check and is resolved by the gate's policy, so one broken
/// task fails the batch instead of counting as unmet.
pub struct TaskChecker {
    /// Tasks supplied at construction, resolved by `init`.
    inputs: Vec<Arc<dyn Task>>,
    /// Resolved, active tasks.
    tasks: RwLock<Vec<Arc<dyn Task>>>,
    /// Privileged lookup context used to resolve tasks.
    api: Option<Arc<dyn PlatformApi>>,
    prompter: Arc<dyn Prompter>,
}

impl TaskChecker {
    /// Create a checker over `tasks`. They are resolved when the gate runs `init`.
    #[must_use]
    pub fn new(tasks: Vec<Arc<dyn Task>>) -> Self {
        Self {
            inputs: tasks,
            tasks: RwLock::new(Vec::new()),
            api: None,
            prompter: Arc::new(DefaultPrompter),
        }
    }

    /// Attach the privileged lookup context used for task resolution.
    #[must_use]
    pub fn with_api(mut self, api: Arc<dyn PlatformApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Replace the default prompt.
    #[must_use]
    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Snapshot of the active tasks.
    #[must_use]
    pub fn tasks(&self) -> Vec<Arc<dyn Task>> {
        self.tasks.read().clone()
    }

    /// Resolve and append a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`](crate::Error::Resolution) if the task
    /// cannot be resolved; it is not added.
    pub async fn add_task(&self, task: Arc<dyn Task>) -> Result<()> {
        task.resolve(self.api.as_deref()).await?;
        debug!("Added task {}", task.target());
        self.tasks.write().push(task);
        Ok(())
    }

    /// Remove the first task whose target equals `target`.
    pub fn remove_task(&self, target: &str) -> bool {
        let mut tasks = self.tasks.write();
        match tasks.iter().position(|task| task.target() == target) {
            Some(index) => {
                tasks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove all tasks.
    pub fn clear_tasks(&self) {
        self.tasks.write().clear();
    }

    /// Replace all tasks.
    ///
    /// Every task is resolved first; on failure the current tasks are kept.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error.
    pub async fn set_tasks(&self, tasks: Vec<Arc<dyn Task>>) -> Result<()> {
        for task in &tasks {
            task.resolve(self.api.as_deref()).await?;
        }
        *self.tasks.write() = tasks;
        Ok(())
    }
}

#[async_trait]
impl Checker for TaskChecker {
    fn name(&self) -> &'static str {
        "tasks"
    }

    async fn init(&self) -> Result<()> {
        self.set_tasks(self.inputs.clone()).await?;
        info!("Task checker initialized with {} tasks", self.inputs.len());
        Ok(())
    }

    async fn check(&self, ctx: &RequestContext) -> Result<CheckResult> {
        let tasks = self.tasks();
        if ctx.subject().is_none() || tasks.is_empty() {
            return Ok(CheckResult::pass_with_tasks(tasks));
        }

        // Siblings run to completion even when one fails
        let outcomes = join_all(tasks.iter().map(|task| task.check(ctx))).await;

        let mut unmet: Vec<Arc<dyn Task>> = Vec::new();
        let mut to_show: Vec<Arc<dyn Task>> = Vec::new();
        for (task, outcome) in tasks.iter().zip(outcomes) {
            let done = outcome?;
            if !done {
                unmet.push(Arc::clone(task));
            }
            if !done || task.always_show() {
                to_show.push(Arc::clone(task));
            }
        }

        if unmet.is_empty() {
            return Ok(CheckResult::pass_with_tasks(tasks));
        }

        debug!("{} of {} tasks unmet", unmet.len(), tasks.len());
        self.prompter.prompt(ctx, &to_show, unmet.len()).await?;
        Ok(CheckResult::block(Some(unmet)))
    }
}
