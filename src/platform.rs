//! Privileged lookup context consumed by tasks and the default prompt.
//!
//! The bot platform itself (sending messages, resolving chats, querying
//! membership) lives outside this crate. Tasks and checkers only see it
//! through [`PlatformApi`], and degrade to skip or optimistic-pass when no
//! implementation is injected.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a chat: numeric identifier or public username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatRef {
    /// Numeric chat identifier.
    Id(i64),
    /// Public username, with or without a leading `@`.
    Username(String),
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "@{}", name.trim_start_matches('@')),
        }
    }
}

impl From<i64> for ChatRef {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for ChatRef {
    fn from(name: &str) -> Self {
        Self::Username(name.to_string())
    }
}

/// Kind of chat returned by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// One-to-one conversation with a user.
    Private,
    /// Basic group.
    Group,
    /// Supergroup.
    Supergroup,
    /// Broadcast channel.
    Channel,
}

/// Chat details returned by [`PlatformApi::get_chat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    /// Chat kind.
    pub kind: ChatKind,
    /// Title, present for groups and channels.
    pub title: Option<String>,
    /// Public username, if any.
    pub username: Option<String>,
    /// Primary invite link, if the bot can see one.
    pub invite_link: Option<String>,
}

impl ChatInfo {
    /// Returns true for chats a subject can subscribe to (groups and channels).
    #[must_use]
    pub fn is_channel_like(&self) -> bool {
        !matches!(self.kind, ChatKind::Private)
    }

    /// Public URL for the chat: invite link first, then the username.
    #[must_use]
    pub fn public_url(&self) -> Option<String> {
        self.invite_link.clone().or_else(|| {
            self.username
                .as_ref()
                .map(|name| format!("https://t.me/{}", name.trim_start_matches('@')))
        })
    }
}

/// Membership status of a subject in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    /// Chat owner.
    Creator,
    /// Chat administrator.
    Administrator,
    /// Regular member.
    Member,
    /// Member with restrictions.
    Restricted,
    /// Not a member.
    Left,
    /// Banned from the chat.
    Kicked,
}

impl MemberStatus {
    /// Any status other than [`MemberStatus::Left`] counts as joined.
    #[must_use]
    pub fn is_joined(self) -> bool {
        !matches!(self, Self::Left)
    }
}

/// Harmless chat actions used to probe prior contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    /// "typing..." indicator.
    Typing,
}

/// A URL button shown under a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptButton {
    /// Button label.
    pub label: String,
    /// Destination URL.
    pub url: String,
}

/// A prompt asking the subject to complete tasks. One button per row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// HTML message text.
    pub text: String,
    /// URL buttons, one per row.
    pub buttons: Vec<PromptButton>,
}

/// Privileged capabilities of the host bot platform.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Look up a chat by id or username.
    async fn get_chat(&self, chat: &ChatRef) -> Result<ChatInfo>;

    /// Query a subject's membership status in a chat.
    async fn get_chat_member(&self, chat: &ChatRef, user_id: i64) -> Result<MemberStatus>;

    /// Send a chat action to a subject. Fails if the subject never contacted the bot.
    async fn send_chat_action(&self, user_id: i64, action: ChatAction) -> Result<()>;

    /// Deliver a prompt to a chat.
    async fn send_prompt(&self, chat_id: i64, prompt: &Prompt) -> Result<()>;
}
