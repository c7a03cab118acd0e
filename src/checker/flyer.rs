//! Flyer sponsor-service checker.
//!
//! Flyer always prompts the subject itself, so a block never carries tasks.

use crate::checker::service::{self, Credential, ServiceClient};
use crate::checker::{CheckResult, Checker};
use crate::config::FlyerConfig;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

const SERVICE: &str = "flyer";

/// Gates subjects behind Flyer sponsor tasks.
pub struct FlyerChecker {
    config: FlyerConfig,
    client: ServiceClient,
}

impl FlyerChecker {
    /// Create a checker.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: FlyerConfig) -> Result<Self> {
        let client = ServiceClient::new(
            &config.base_url,
            &config.key,
            Credential::JsonField("key"),
            Duration::from_millis(config.timeout_ms),
        )?;
        Ok(Self { config, client })
    }

    fn payload(&self, ctx: &RequestContext, user_id: i64) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("user_id".into(), json!(user_id));
        if let Some(language_code) = ctx.language_code() {
            payload.insert("language_code".into(), json!(language_code));
        }
        if let Some(message) = &self.config.message {
            payload.insert("message".into(), json!(message));
        }
        payload
    }

    async fn request(&self, ctx: &RequestContext, user_id: i64) -> Result<CheckResult> {
        let reply = self.client.post("/check", self.payload(ctx, user_id)).await?;

        if !reply.status.is_success() || reply.str_field("error").is_some() {
            let message = reply
                .str_field("error")
                .unwrap_or("flyer_request_failed")
                .to_string();
            warn!("Flyer reported an error for {user_id}, letting through: {message}");
            let mut meta = Map::new();
            meta.insert(SERVICE.into(), reply.body);
            meta.insert("error".into(), Value::String(message));
            return Ok(CheckResult::fail_open(meta));
        }

        if reply.body.get("skip").and_then(Value::as_bool) == Some(true) {
            return Ok(CheckResult::pass().with_meta(SERVICE, reply.body));
        }

        debug!("Flyer prompts subject {user_id} itself");
        Ok(CheckResult::block(None).with_meta(SERVICE, reply.body))
    }
}

#[async_trait]
impl Checker for FlyerChecker {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn init(&self) -> Result<()> {
        if !self.config.verify_on_init {
            return Ok(());
        }

        let reply = match self.client.post("/get_me", Map::new()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Flyer key probe failed, continuing: {e}");
                return Ok(());
            }
        };

        if reply.body.get("status").and_then(Value::as_bool) == Some(true) {
            info!("Flyer key verified");
            return Ok(());
        }
        if !reply.parsed {
            warn!("Flyer key probe returned {}, continuing", reply.status);
            return Ok(());
        }
        Err(Error::InvalidCredential(match reply.str_field("error") {
            Some(error) => format!("Flyer key verification failed: {error}"),
            None => "Flyer key verification failed".to_string(),
        }))
    }

    async fn check(&self, ctx: &RequestContext) -> Result<CheckResult> {
        let Some(subject) = ctx.subject() else {
            return Ok(CheckResult::pass().uncached());
        };

        match self.request(ctx, subject.id).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Flyer check failed for {}: {e}", subject.id);
                Ok(service::unreachable(SERVICE, &e))
            }
        }
    }
}
