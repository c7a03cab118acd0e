//! Prompting the subject to complete unmet tasks.

use crate::checker::tasks::Task;
use crate::context::RequestContext;
use crate::error::Result;
use crate::i18n;
use crate::platform::{Prompt, PromptButton};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Delivers a prompt listing tasks to the subject.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Prompt the subject.
    ///
    /// `to_show` holds unmet tasks plus completed `always_show` tasks;
    /// `unmet` is the number of tasks actually blocking.
    ///
    /// # Errors
    ///
    /// Errors fail the check that triggered the prompt.
    async fn prompt(
        &self,
        ctx: &RequestContext,
        to_show: &[Arc<dyn Task>],
        unmet: usize,
    ) -> Result<()>;
}

/// Build the localized prompt: pluralized text and one URL button per task.
#[must_use]
pub fn build_prompt(ctx: &RequestContext, to_show: &[Arc<dyn Task>], unmet: usize) -> Prompt {
    let text = i18n::translation(ctx.language_code()).prompt_text(unmet);
    let buttons = to_show
        .iter()
        .map(|task| PromptButton {
            label: task.button(ctx),
            url: task.target(),
        })
        .collect();
    Prompt {
        text: text.to_string(),
        buttons,
    }
}

/// Sends [`build_prompt`] through the request's platform api.
///
/// Goes to the originating chat, or the subject's private chat when none is
/// known. Does nothing when the request carries no platform api.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPrompter;

#[async_trait]
impl Prompter for DefaultPrompter {
    async fn prompt(
        &self,
        ctx: &RequestContext,
        to_show: &[Arc<dyn Task>],
        unmet: usize,
    ) -> Result<()> {
        let Some(chat_id) = ctx.chat_id().or_else(|| ctx.subject().map(|s| s.id)) else {
            debug!("No chat to prompt");
            return Ok(());
        };
        let Some(api) = ctx.api() else {
            warn!("No platform api on request, prompt for chat {chat_id} dropped");
            return Ok(());
        };

        let prompt = build_prompt(ctx, to_show, unmet);
        api.send_prompt(chat_id, &prompt).await
    }
}
