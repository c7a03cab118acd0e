//! SubGram sponsor-service checker.
//!
//! Asks SubGram whether the subject still owes sponsor subscriptions.
//!
//! | reply                            | outcome                                  |
//! |----------------------------------|------------------------------------------|
//! | `status=error` or `code != 200`  | pass (fail-open), error in meta, uncached |
//! | `status=warning`, get-links mode | block with sponsor tasks, local prompt   |
//! | `status=warning`, turnkey mode   | block, SubGram prompts the subject       |
//! | anything else                    | pass                                     |
//! | unreachable / malformed          | block, no tasks (fail-closed)            |

use crate::checker::prompt::{DefaultPrompter, Prompter};
use crate::checker::service::{self, Credential, ServiceClient, ServiceReply};
use crate::checker::tasks::{CustomTask, Task};
use crate::checker::{CheckResult, Checker};
use crate::config::SubGramConfig;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const SERVICE: &str = "subgram";

#[derive(Debug, Default, Deserialize)]
struct SubGramReply {
    status: Option<String>,
    code: Option<i64>,
    message: Option<String>,
    error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    result: Option<SponsorBlock>,
    #[serde(default, deserialize_with = "lenient")]
    additional: Option<SponsorBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct SponsorBlock {
    #[serde(default, deserialize_with = "lenient_list")]
    sponsors: Option<Vec<Sponsor>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Sponsor {
    link: Option<String>,
    button_text: Option<String>,
    status: Option<String>,
    available_now: Option<bool>,
}

/// A field of the wrong shape reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Entries of the wrong shape are skipped; the rest are kept.
fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
    ))
}

impl SubGramReply {
    fn from_reply(reply: &ServiceReply) -> Self {
        serde_json::from_value(reply.body.clone()).unwrap_or_default()
    }

    fn error_message(&self) -> String {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("subgram_request_failed")
            .to_string()
    }
}

/// Gates subjects behind SubGram sponsor subscriptions.
pub struct SubGramChecker {
    config: SubGramConfig,
    client: ServiceClient,
    prompter: Arc<dyn Prompter>,
}

impl SubGramChecker {
    /// Create a checker.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: SubGramConfig) -> Result<Self> {
        let client = ServiceClient::new(
            &config.base_url,
            &config.key,
            Credential::Header("Auth"),
            Duration::from_millis(config.timeout_ms),
        )?;
        Ok(Self {
            config,
            client,
            prompter: Arc::new(DefaultPrompter),
        })
    }

    /// Replace the prompt used in get-links mode.
    #[must_use]
    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    fn payload(&self, ctx: &RequestContext, chat_id: i64, user_id: i64) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("chat_id".into(), json!(chat_id));
        payload.insert("user_id".into(), json!(user_id));
        if let Some(subject) = ctx.subject() {
            if let Some(first_name) = &subject.first_name {
                payload.insert("first_name".into(), json!(first_name));
            }
            if let Some(username) = &subject.username {
                payload.insert("username".into(), json!(username));
            }
            if let Some(language_code) = &subject.language_code {
                payload.insert("language_code".into(), json!(language_code));
            }
            if let Some(is_premium) = subject.is_premium {
                payload.insert("is_premium".into(), json!(is_premium));
            }
        }
        if !self.config.exclude_resource_ids.is_empty() {
            payload.insert(
                "exclude_resource_ids".into(),
                json!(self.config.exclude_resource_ids),
            );
        }
        if !self.config.exclude_ads_ids.is_empty() {
            payload.insert("exclude_ads_ids".into(), json!(self.config.exclude_ads_ids));
        }
        if let Some(max_sponsors) = self.config.max_sponsors {
            payload.insert("max_sponsors".into(), json!(max_sponsors));
        }
        if let Some(action) = self.config.action {
            payload.insert("action".into(), json!(action));
        }
        payload
    }

    /// Sponsors still awaiting subscription, as tasks that never complete
    /// locally. They are re-verified by asking SubGram again.
    fn sponsor_tasks(sponsors: &[Sponsor]) -> Vec<Arc<dyn Task>> {
        sponsors
            .iter()
            .filter(|s| s.available_now == Some(true) && s.status.as_deref() == Some("unsubscribed"))
            .filter_map(|s| {
                let link = s.link.clone().filter(|l| !l.is_empty())?;
                let label = s
                    .button_text
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Subscribe".to_string());
                let task = CustomTask::new(link, |_| async { Ok(false) }.boxed())
                    .with_button(move |_| label.clone());
                Some(Arc::new(task) as Arc<dyn Task>)
            })
            .collect()
    }

    async fn request(&self, ctx: &RequestContext, chat_id: i64, user_id: i64) -> Result<CheckResult> {
        let reply = self
            .client
            .post("/get-sponsors", self.payload(ctx, chat_id, user_id))
            .await?;
        let data = SubGramReply::from_reply(&reply);

        if data.status.as_deref() == Some("error") || data.code != Some(200) {
            // Broken upstream must never block legitimate users
            let message = data.error_message();
            warn!("SubGram reported an error for {user_id}, letting through: {message}");
            let mut meta = Map::new();
            meta.insert(SERVICE.into(), reply.body);
            meta.insert("error".into(), Value::String(message));
            return Ok(CheckResult::fail_open(meta));
        }

        if data.status.as_deref() != Some("warning") {
            return Ok(CheckResult::pass().with_meta(SERVICE, reply.body));
        }

        let additional = data.additional.as_ref().and_then(|a| a.sponsors.as_ref());
        let get_links = self.config.get_links_mode.unwrap_or(additional.is_some());
        if !get_links {
            debug!("SubGram prompts subject {user_id} itself");
            return Ok(CheckResult::block(None).with_meta(SERVICE, reply.body));
        }

        let sponsors = additional
            .or_else(|| data.result.as_ref().and_then(|r| r.sponsors.as_ref()))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let tasks = Self::sponsor_tasks(sponsors);
        if tasks.is_empty() {
            return Ok(CheckResult::block(None).with_meta(SERVICE, reply.body));
        }

        debug!("Subject {user_id} owes {} sponsor subscriptions", tasks.len());
        self.prompter.prompt(ctx, &tasks, tasks.len()).await?;
        Ok(CheckResult::block(Some(tasks)).with_meta(SERVICE, reply.body))
    }
}

#[async_trait]
impl Checker for SubGramChecker {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn init(&self) -> Result<()> {
        if !self.config.verify_on_init {
            return Ok(());
        }

        let reply = match self.client.post("/get-balance", Map::new()).await {
            Ok(reply) => reply,
            Err(e) => {
                // Deferred to runtime: the first check will surface a bad key
                warn!("SubGram key probe failed, continuing: {e}");
                return Ok(());
            }
        };

        let data = SubGramReply::from_reply(&reply);
        if data.code == Some(401) || reply.status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::InvalidCredential(
                "SubGram API key verification failed: invalid API key".to_string(),
            ));
        }
        if data.status.as_deref() == Some("error") {
            if !reply.parsed {
                warn!("SubGram key probe returned {}, continuing", reply.status);
                return Ok(());
            }
            return Err(Error::InvalidCredential(format!(
                "SubGram API key verification failed: {}",
                data.message
                    .as_deref()
                    .or(data.error.as_deref())
                    .unwrap_or("unknown error")
            )));
        }

        info!("SubGram key verified");
        Ok(())
    }

    async fn check(&self, ctx: &RequestContext) -> Result<CheckResult> {
        let Some(subject) = ctx.subject() else {
            return Ok(CheckResult::pass().uncached());
        };
        let Some(chat_id) = ctx.chat_id() else {
            return Ok(CheckResult::pass().uncached());
        };

        match self.request(ctx, chat_id, subject.id).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("SubGram check failed for {}: {e}", subject.id);
                Ok(service::unreachable(SERVICE, &e))
            }
        }
    }
}
