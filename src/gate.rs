//! Verification orchestrator.
//!
//! A [`Gate`] binds a [`Checker`] to an optional cross-request cache and a
//! failure policy. It is attached to each request by [`Gate::handle`]; the
//! request's `verify_tasks()` then runs:
//!
//! 1. A pass already recorded on this request is reused.
//! 2. Requests without a subject pass.
//! 3. A cached verified sentinel for the subject passes without checking.
//! 4. Otherwise the checker runs; cacheable passes are written back.
//! 5. The outcome is recorded on the request.
//! 6. Errors go to the error hook and are resolved fail-open or fail-closed.
//!
//! The request-local outcome and the cross-request cache are separate
//! layers: the first stops duplicate work within a request, the second
//! never holds anything but passes.

use crate::cache::{CacheAdapter, MemoryCache, VERIFIED_SENTINEL};
use crate::checker::{CheckResult, Checker, FlyerChecker, SubGramChecker};
use crate::config::{CheckerConfig, GateConfig, Settings};
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::event::{GateEvent, GateEventsSender};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Derives the cross-request cache key for a request. `None` disables caching for it.
pub type CacheKeyFn = Arc<dyn Fn(&RequestContext) -> Option<String> + Send + Sync>;

/// Observes verification errors. Never influences the decision.
pub type ErrorHook = Arc<dyn Fn(&Error, &RequestContext) + Send + Sync>;

/// Builder for [`Gate`].
pub struct GateBuilder {
    checker: Arc<dyn Checker>,
    cache: Option<Arc<dyn CacheAdapter>>,
    cache_ttl_seconds: u64,
    cache_key: CacheKeyFn,
    on_error: Option<ErrorHook>,
    fail_open: bool,
    events: Option<GateEventsSender>,
}

fn prefixed_cache_key(prefix: String) -> CacheKeyFn {
    Arc::new(move |ctx: &RequestContext| ctx.subject().map(|s| format!("{prefix}{}", s.id)))
}

impl GateBuilder {
    /// Start from a checker with default policy (fail-open, 1 hour TTL, no cache).
    #[must_use]
    pub fn new(checker: Arc<dyn Checker>) -> Self {
        Self::from_config(checker, &GateConfig::default())
    }

    /// Start from a checker and a policy section.
    #[must_use]
    pub fn from_config(checker: Arc<dyn Checker>, config: &GateConfig) -> Self {
        Self {
            checker,
            cache: None,
            cache_ttl_seconds: config.cache_ttl_seconds,
            cache_key: prefixed_cache_key(config.cache_key_prefix.clone()),
            on_error: None,
            fail_open: config.fail_open,
            events: None,
        }
    }

    /// Build the configured checker and in-process cache from a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no checker is configured, or the
    /// checker's construction error.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let checker: Arc<dyn Checker> = match &settings.checker {
            Some(CheckerConfig::SubGram(config)) => Arc::new(SubGramChecker::new(config.clone())?),
            Some(CheckerConfig::Flyer(config)) => Arc::new(FlyerChecker::new(config.clone())?),
            None => return Err(Error::Config("no checker configured".to_string())),
        };

        let mut builder = Self::from_config(checker, &settings.gate);
        if let Some(cache) = &settings.cache {
            builder = builder.cache(Arc::new(MemoryCache::with_capacity_and_ttl(
                cache.max_entries,
                cache.ttl_seconds,
            )));
        }
        Ok(builder)
    }

    /// Cache positive outcomes in `cache`.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CacheAdapter>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Seconds a positive outcome stays cached.
    #[must_use]
    pub fn cache_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.cache_ttl_seconds = ttl_seconds;
        self
    }

    /// Replace the cache key derivation.
    #[must_use]
    pub fn cache_key<F>(mut self, cache_key: F) -> Self
    where
        F: Fn(&RequestContext) -> Option<String> + Send + Sync + 'static,
    {
        self.cache_key = Arc::new(cache_key);
        self
    }

    /// Observe verification errors.
    #[must_use]
    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: Fn(&Error, &RequestContext) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    /// Let subjects through (`true`) or block them (`false`) on errors.
    #[must_use]
    pub fn fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    /// Publish [`GateEvent`]s.
    #[must_use]
    pub fn events(mut self, events: GateEventsSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Initialize the checker and build the gate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CheckerInit`] if the checker fails to initialize.
    pub async fn build(self) -> Result<Arc<Gate>> {
        let name = self.checker.name();
        self.checker
            .init()
            .await
            .map_err(|e| Error::checker_init(name, e))?;

        info!(
            "Verification gate ready (checker={name}, cache={}, ttl={}s, fail_open={})",
            self.cache.is_some(),
            self.cache_ttl_seconds,
            self.fail_open
        );

        Ok(Arc::new(Gate {
            checker: self.checker,
            cache: self.cache,
            cache_ttl_seconds: self.cache_ttl_seconds,
            cache_key: self.cache_key,
            on_error: self.on_error,
            fail_open: self.fail_open,
            events: self.events,
        }))
    }
}

/// A reusable verification gate.
pub struct Gate {
    checker: Arc<dyn Checker>,
    cache: Option<Arc<dyn CacheAdapter>>,
    cache_ttl_seconds: u64,
    cache_key: CacheKeyFn,
    on_error: Option<ErrorHook>,
    fail_open: bool,
    events: Option<GateEventsSender>,
}

impl Gate {
    /// Start building a gate around `checker`.
    #[must_use]
    pub fn builder(checker: Arc<dyn Checker>) -> GateBuilder {
        GateBuilder::new(checker)
    }

    /// Middleware entry point: attach the gate to the request and continue.
    ///
    /// Never short-circuits the pipeline; the continuation decides what to
    /// do with `verify_tasks()`.
    pub async fn handle<F, Fut, T>(self: &Arc<Self>, mut ctx: RequestContext, next: F) -> T
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = T>,
    {
        ctx.gate = Some(Arc::clone(self));
        ctx.verification = None;
        next(ctx).await
    }

    /// Whether errors let subjects through.
    #[must_use]
    pub fn is_fail_open(&self) -> bool {
        self.fail_open
    }

    /// Verify the request's subject. Idempotent within a request; never fails.
    pub async fn verify_tasks(&self, ctx: &mut RequestContext) -> bool {
        if ctx.verification.as_ref().is_some_and(|v| v.ok) {
            return true;
        }
        let Some(subject_id) = ctx.subject().map(|s| s.id) else {
            return true;
        };

        let key = (self.cache_key)(ctx);
        match self.run(ctx, key.as_deref()).await {
            Ok((result, from_cache)) => {
                let ok = result.ok;
                if ok {
                    debug!("Subject {subject_id} verified (from_cache={from_cache})");
                    self.emit(GateEvent::Verified {
                        subject_id,
                        from_cache,
                    });
                } else {
                    debug!("Subject {subject_id} blocked");
                    self.emit(GateEvent::Blocked {
                        subject_id,
                        unmet: result.tasks.as_ref().map(Vec::len),
                    });
                }
                ctx.verification = Some(result);
                ok
            }
            Err(e) => {
                warn!(
                    "Verification failed for subject {subject_id} ({}): {e}",
                    if self.fail_open { "allowing" } else { "blocking" }
                );
                if let Some(hook) = &self.on_error {
                    hook(&e, &*ctx);
                }
                self.emit(GateEvent::Failed {
                    subject_id,
                    message: e.to_string(),
                    allowed: self.fail_open,
                });

                let mut meta = Map::new();
                meta.insert("error".into(), Value::from("verification_failed"));
                let outcome = if self.fail_open {
                    CheckResult::fail_open(meta)
                } else {
                    CheckResult {
                        meta,
                        ..CheckResult::block(None)
                    }
                };
                ctx.verification = Some(outcome);
                self.fail_open
            }
        }
    }

    /// Cache lookup, then checker, then best-effort cache write.
    async fn run(&self, ctx: &RequestContext, key: Option<&str>) -> Result<(CheckResult, bool)> {
        let cache = self.cache.as_ref().zip(key);

        if let Some((cache, key)) = cache {
            if cache.get(key).await?.as_deref() == Some(VERIFIED_SENTINEL) {
                return Ok((CheckResult::pass(), true));
            }
        }

        let result = self.checker.check(ctx).await?;

        if let Some((cache, key)) = cache.filter(|_| result.should_cache()) {
            // The decision is already made; a failed write must not flip it
            if let Err(e) = cache
                .set_with_ttl(key, self.cache_ttl_seconds, VERIFIED_SENTINEL)
                .await
            {
                warn!("Failed to cache verification for {key}: {e}");
                if let Some(hook) = &self.on_error {
                    hook(&e, ctx);
                }
            }
        }

        Ok((result, false))
    }

    fn emit(&self, event: GateEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
