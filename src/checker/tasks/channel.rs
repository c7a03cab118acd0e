//! Channel/group membership task.

use crate::checker::tasks::{ButtonFn, Task};
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::i18n;
use crate::platform::{ChatRef, PlatformApi};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
struct ChannelTarget {
    url: Option<String>,
    resolved: bool,
}

/// Requires the subject to be a member of a channel or group.
///
/// Constructed with a chat identifier and optionally a URL. Without a URL,
/// [`Task::resolve`] looks up an invite link or public username.
pub struct ChannelTask {
    chat: ChatRef,
    target: Mutex<ChannelTarget>,
    button_fn: Option<ButtonFn>,
    always_show: bool,
}

impl ChannelTask {
    /// Create a task for a chat that still needs resolving.
    #[must_use]
    pub fn new(chat: impl Into<ChatRef>) -> Self {
        Self {
            chat: chat.into(),
            target: Mutex::new(ChannelTarget::default()),
            button_fn: None,
            always_show: false,
        }
    }

    /// Create a task with a known URL. Resolution becomes a no-op.
    #[must_use]
    pub fn with_url(chat: impl Into<ChatRef>, url: impl Into<String>) -> Self {
        let task = Self::new(chat);
        *task.target.lock() = ChannelTarget {
            url: Some(url.into()),
            resolved: true,
        };
        task
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

    /// The chat this task checks membership of.
    #[must_use]
    pub fn chat(&self) -> &ChatRef {
        &self.chat
    }
}

#[async_trait]
impl Task for ChannelTask {
    fn target(&self) -> String {
        self.target
            .lock()
            .url
            .clone()
            .unwrap_or_else(|| self.chat.to_string())
    }

    fn is_resolved(&self) -> bool {
        self.target.lock().resolved
    }

    async fn resolve(&self, api: Option<&dyn PlatformApi>) -> Result<()> {
        let current = self.target.lock().clone();
        if current.resolved {
            return Ok(());
        }

        let Some(api) = api else {
            if current.url.is_none() {
                return Err(Error::Resolution(format!(
                    "channel task {} requires a url or a platform api to resolve it",
                    self.chat
                )));
            }
            self.target.lock().resolved = true;
            return Ok(());
        };

        let chat = api.get_chat(&self.chat).await?;
        if !chat.is_channel_like() {
            return Err(Error::Resolution(format!(
                "chat {} is not a channel",
                self.chat
            )));
        }

        let url = current.url.or_else(|| chat.public_url()).ok_or_else(|| {
            Error::Resolution(format!(
                "chat {} has no invite link and no username",
                self.chat
            ))
        })?;

        info!("Resolved channel task {} to {url}", self.chat);
        *self.target.lock() = ChannelTarget {
            url: Some(url),
            resolved: true,
        };
        Ok(())
    }

    async fn check(&self, ctx: &RequestContext) -> Result<bool> {
        let Some(subject) = ctx.subject() else {
            return Ok(true);
        };
        let Some(api) = ctx.api() else {
            debug!(
                "No platform api on request, skipping membership check for {}",
                self.chat
            );
            return Ok(true);
        };

        let status = api.get_chat_member(&self.chat, subject.id).await?;
        Ok(status.is_joined())
    }

    fn button(&self, ctx: &RequestContext) -> String {
        match &self.button_fn {
            Some(button) => button(ctx),
            None => i18n::translation(ctx.language_code())
                .button_label_channel
                .to_string(),
        }
    }

    fn always_show(&self) -> bool {
        self.always_show
    }
}
