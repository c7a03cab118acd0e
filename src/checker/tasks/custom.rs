//! Task backed by caller-supplied predicate and label functions.

use crate::checker::tasks::Task;
use crate::context::RequestContext;
use crate::error::Result;
use crate::i18n;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Completion predicate for a [`CustomTask`].
pub type CheckFn =
    Arc<dyn for<'a> Fn(&'a RequestContext) -> BoxFuture<'a, Result<bool>> + Send + Sync>;

/// Button label function.
pub type ButtonFn = Arc<dyn Fn(&RequestContext) -> String + Send + Sync>;

/// Escape hatch for conditions that don't fit the built-in shapes.
///
/// ```rust,ignore
/// use futures::FutureExt;
///
/// let task = CustomTask::new("https://example.com/quiz", |ctx| {
///     async move { quiz_api.passed(ctx.subject().map(|s| s.id)).await }.boxed()
/// });
/// ```
#[derive(Clone)]
pub struct CustomTask {
    url: String,
    check_fn: CheckFn,
    button_fn: Option<ButtonFn>,
    always_show: bool,
}

impl CustomTask {
    /// Create a task pointing at `url` and completed when `check` yields true.
    pub fn new<F>(url: impl Into<String>, check: F) -> Self
    where
        F: for<'a> Fn(&'a RequestContext) -> BoxFuture<'a, Result<bool>> + Send + Sync + 'static,
    {
        Self {
            url: url.into(),
            check_fn: Arc::new(check),
            button_fn: None,
            always_show: false,
        }
    }

    /// Override the button label.
    #[must_use]
    pub fn with_button<F>(mut self, button: F) -> Self
    where
        F: Fn(&RequestContext) -> String + Send + Sync + 'static,
    {
        self.button_fn = Some(Arc::new(button));
        self
    }

    /// Keep the task visible in prompts even once completed.
    #[must_use]
    pub fn with_always_show(mut self, always_show: bool) -> Self {
        self.always_show = always_show;
        self
    }
}

#[async_trait]
impl Task for CustomTask {
    fn target(&self) -> String {
        self.url.clone()
    }

    async fn check(&self, ctx: &RequestContext) -> Result<bool> {
        (self.check_fn)(ctx).await
    }

    fn button(&self, ctx: &RequestContext) -> String {
        match &self.button_fn {
            Some(button) => button(ctx),
            // Falls back to the channel label
            None => i18n::translation(ctx.language_code())
                .button_label_channel
                .to_string(),
        }
    }

    fn always_show(&self) -> bool {
        self.always_show
    }
}
