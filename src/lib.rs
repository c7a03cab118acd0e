//! # verification-gate
//!
//! Verification orchestration for bot interactions. A [`Gate`] is attached
//! to every incoming request and exposes `verify_tasks()`, which decides
//! whether the requesting subject has completed a set of prerequisite
//! tasks: joining channels, starting bots, custom predicates, or sponsor
//! subscriptions tracked by a remote service.
//!
//! ## Architecture
//!
//! ```text
//! request ──► Gate::handle ──► handler ──► ctx.verify_tasks()
//!                                              │
//!                       request-local outcome ─┤ (reused within a request)
//!                       cross-request cache  ──┤ (positive outcomes only)
//!                                              ▼
//!                                   Checker::check(ctx)
//!                                   ├── TaskChecker (channel / bot / custom tasks)
//!                                   ├── SubGramChecker
//!                                   └── FlyerChecker
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use verification_gate::{ChannelTask, Gate, MemoryCache, RequestContext, Subject, TaskChecker};
//! use std::sync::Arc;
//!
//! let checker = TaskChecker::new(vec![Arc::new(ChannelTask::new("@news"))]).with_api(api.clone());
//! let gate = Gate::builder(Arc::new(checker))
//!     .cache(Arc::new(MemoryCache::new()))
//!     .build()
//!     .await?;
//!
//! let ctx = RequestContext::for_subject(Subject::new(42)).with_api(api);
//! gate.handle(ctx, |mut ctx| async move {
//!     if ctx.verify_tasks().await {
//!         // serve the request
//!     }
//! })
//! .await;
//! ```

pub mod cache;
pub mod checker;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod gate;
pub mod i18n;
pub mod platform;


pub use cache::{CacheAdapter, CacheStats, KeyValueStore, MemoryCache, RemoteCache};
pub use checker::{
    BotTask, ChannelTask, CheckResult, Checker, CustomTask, DefaultPrompter, FlyerChecker,
    Prompter, SubGramChecker, Task, TaskChecker,
};
pub use config::{FlyerConfig, GateConfig, Settings, SubGramConfig};
pub use context::{RequestContext, Subject};
pub use error::{Error, Result};
pub use event::{create_event_channel, GateEvent, GateEventsChannel, GateEventsSender};
pub use gate::{Gate, GateBuilder};
pub use platform::{ChatInfo, ChatRef, MemberStatus, PlatformApi};
