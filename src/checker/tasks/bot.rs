//! Companion-bot started task.

use crate::checker::tasks::{ButtonFn, Task};
use crate::context::RequestContext;
use crate::error::Result;
use crate::i18n;
use crate::platform::{ChatAction, PlatformApi};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Requires the subject to have started a companion bot.
///
/// Contact is inferred by sending a harmless chat action through the
/// companion bot's own api: success means the subject has talked to it.
/// Without that api the task is offered but never blocks.
pub struct BotTask {
    username: String,
    url: String,
    api: Option<Arc<dyn PlatformApi>>,
    button_fn: Option<ButtonFn>,
    always_show: bool,
}

impl BotTask {
    /// Create a task for `username`, linking to `https://t.me/<username>`.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        let url = format!("https://t.me/{}", username.trim_start_matches('@'));
        Self {
            username,
            url,
            api: None,
            button_fn: None,
            always_show: false,
        }
    }

    /// Override the destination URL (e.g. a deep link with a start parameter).
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Attach the companion bot's api, enabling the contact probe.
    #[must_use]
    pub fn with_api(mut self, api: Arc<dyn PlatformApi>) -> Self {
        self.api = Some(api);
        self
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

    /// The companion bot's username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

#[async_trait]
impl Task for BotTask {
    fn target(&self) -> String {
        self.url.clone()
    }

    async fn check(&self, ctx: &RequestContext) -> Result<bool> {
        let Some(api) = &self.api else {
            return Ok(true);
        };
        let Some(subject) = ctx.subject() else {
            return Ok(true);
        };

        // A failed probe is the answer, not an error
        match api.send_chat_action(subject.id, ChatAction::Typing).await {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!(
                    "Subject {} has not started @{}: {e}",
                    subject.id, self.username
                );
                Ok(false)
            }
        }
    }

    fn button(&self, ctx: &RequestContext) -> String {
        match &self.button_fn {
            Some(button) => button(ctx),
            None => i18n::translation(ctx.language_code())
                .button_label_bot
                .to_string(),
        }
    }

    fn always_show(&self) -> bool {
        self.always_show
    }
}
