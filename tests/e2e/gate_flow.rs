//! Gate flows over platform-backed tasks.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::TestPlatform;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use verification_gate::platform::PlatformApi;
use verification_gate::{
    BotTask, CacheAdapter, ChannelTask, CustomTask, Error, Gate, MemoryCache, RequestContext,
    Subject, Task, TaskChecker,
};

const NEWS: i64 = -1_001_000;
const USER: i64 = 7;

fn platform_with_news() -> Arc<TestPlatform> {
    let platform = Arc::new(TestPlatform::default());
    platform.add_channel(NEWS, "news");
    platform
}

fn request(platform: &Arc<TestPlatform>, user_id: i64) -> RequestContext {
    RequestContext::for_subject(Subject::new(user_id).with_language("en"))
        .with_chat(user_id)
        .with_api(Arc::clone(platform) as Arc<dyn PlatformApi>)
}

async fn channel_gate(platform: &Arc<TestPlatform>, cache: Arc<MemoryCache>) -> Arc<Gate> {
    let checker = TaskChecker::new(vec![Arc::new(ChannelTask::new(NEWS)) as Arc<dyn Task>])
        .with_api(Arc::clone(platform) as Arc<dyn PlatformApi>);
    Gate::builder(Arc::new(checker))
        .cache(cache)
        .build()
        .await
        .expect("Failed to build gate")
}

async fn verify(gate: &Arc<Gate>, ctx: RequestContext) -> (bool, RequestContext) {
    gate.handle(ctx, |mut ctx| async move {
        let allowed = ctx.verify_tasks().await;
        (allowed, ctx)
    })
    .await
}

/// Anonymous requests pass without touching the checker or the cache.
#[tokio::test]
async fn test_anonymous_request_passes() {
    let platform = platform_with_news();
    let cache = Arc::new(MemoryCache::new());
    let gate = channel_gate(&platform, Arc::clone(&cache)).await;

    let (allowed, ctx) = verify(&gate, RequestContext::new()).await;

    assert!(allowed);
    assert!(ctx.verification().is_none());
    assert_eq!(platform.member_lookups(), 0);
    assert_eq!(cache.stats().hits + cache.stats().misses, 0);
}

/// A channel task with neither a URL nor a lookup context cannot be added.
#[tokio::test]
async fn test_unresolvable_channel_task_is_rejected() {
    let checker = TaskChecker::new(Vec::new());
    let result = checker.add_task(Arc::new(ChannelTask::new(NEWS))).await;

    assert!(matches!(result, Err(Error::Resolution(_))));
    assert!(checker.tasks().is_empty());
}

/// Building a gate over an unresolvable task fails at init.
#[tokio::test]
async fn test_unresolvable_task_fails_gate_build() {
    let checker = TaskChecker::new(vec![Arc::new(ChannelTask::new("@ghost")) as Arc<dyn Task>]);
    let result = Gate::builder(Arc::new(checker)).build().await;

    assert!(matches!(result, Err(Error::CheckerInit { .. })));
}

/// Blocked until the subject joins; then verified once and served from cache.
#[tokio::test]
async fn test_channel_join_flow() {
    let platform = platform_with_news();
    let cache = Arc::new(MemoryCache::new());
    let gate = channel_gate(&platform, Arc::clone(&cache)).await;

    // Not joined: blocked and prompted in the subject's language
    let (allowed, ctx) = verify(&gate, request(&platform, USER)).await;
    assert!(!allowed);
    let verification = ctx.verification().expect("outcome recorded");
    assert_eq!(verification.task_targets(), vec!["https://t.me/news".to_string()]);
    let prompts = platform.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, USER);
    assert_eq!(prompts[0].1.buttons.len(), 1);
    assert_eq!(prompts[0].1.buttons[0].url, "https://t.me/news");
    assert!(cache.get(&format!("c-verif:{USER}")).await.expect("get").is_none());

    // Joined: verified and cached
    platform.join(NEWS, USER);
    let (allowed, _) = verify(&gate, request(&platform, USER)).await;
    assert!(allowed);
    assert_eq!(
        cache.get(&format!("c-verif:{USER}")).await.expect("get").as_deref(),
        Some("1")
    );
    let lookups = platform.member_lookups();

    // Served from cache: no further membership lookups
    let (allowed, ctx) = verify(&gate, request(&platform, USER)).await;
    assert!(allowed);
    assert!(ctx.verification().expect("outcome recorded").ok);
    assert_eq!(platform.member_lookups(), lookups);
    assert_eq!(platform.prompts().len(), 1);
}

/// Repeated calls within one request do not repeat the check.
#[tokio::test]
async fn test_verification_memoized_within_request() {
    let platform = platform_with_news();
    platform.join(NEWS, USER);
    let checker = TaskChecker::new(vec![Arc::new(ChannelTask::new(NEWS)) as Arc<dyn Task>])
        .with_api(Arc::clone(&platform) as Arc<dyn PlatformApi>);
    let gate = Gate::builder(Arc::new(checker)).build().await.expect("build");

    gate.handle(request(&platform, USER), |mut ctx| async move {
        assert!(ctx.verify_tasks().await);
        assert!(ctx.verify_tasks().await);
        assert!(ctx.verify_tasks().await);
    })
    .await;
    assert_eq!(platform.member_lookups(), 1);
}

/// Mixed tasks: only unmet ones block; always-show tasks are still displayed.
#[tokio::test]
async fn test_mixed_tasks_prompt_shows_unmet_and_pinned() {
    let platform = platform_with_news();
    platform.join(NEWS, USER);

    let bot = BotTask::new("@helper_bot")
        .with_api(Arc::clone(&platform) as Arc<dyn PlatformApi>)
        .with_button(|_| "Start helper".to_string());
    let pinned = ChannelTask::new(NEWS).with_always_show(true);
    let checker = TaskChecker::new(vec![
        Arc::new(pinned) as Arc<dyn Task>,
        Arc::new(bot) as Arc<dyn Task>,
    ])
    .with_api(Arc::clone(&platform) as Arc<dyn PlatformApi>);
    let gate = Gate::builder(Arc::new(checker)).build().await.expect("build");

    let (allowed, ctx) = verify(&gate, request(&platform, USER)).await;
    assert!(!allowed);
    assert_eq!(
        ctx.verification().expect("outcome").task_targets(),
        vec!["https://t.me/helper_bot".to_string()]
    );
    let prompts = platform.prompts();
    let urls: Vec<&str> = prompts[0].1.buttons.iter().map(|b| b.url.as_str()).collect();
    assert_eq!(urls, vec!["https://t.me/news", "https://t.me/helper_bot"]);
    assert_eq!(prompts[0].1.buttons[1].label, "Start helper");

    platform.start_bot(USER);
    let (allowed, _) = verify(&gate, request(&platform, USER)).await;
    assert!(allowed);
}

/// A single erroring task fails the batch, resolved by the gate's policy.
#[tokio::test]
async fn test_task_error_follows_gate_policy() {
    for fail_open in [true, false] {
        let platform = platform_with_news();
        platform.join(NEWS, USER);
        let broken = CustomTask::new("https://example.com/quiz", |_| {
            async { Err(Error::Verification("quiz backend down".to_string())) }.boxed()
        });
        let checker = TaskChecker::new(vec![
            Arc::new(ChannelTask::new(NEWS)) as Arc<dyn Task>,
            Arc::new(broken) as Arc<dyn Task>,
        ])
        .with_api(Arc::clone(&platform) as Arc<dyn PlatformApi>);

        let errors = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&errors);
        let cache = Arc::new(MemoryCache::new());
        let gate = Gate::builder(Arc::new(checker))
            .cache(Arc::clone(&cache) as Arc<dyn CacheAdapter>)
            .fail_open(fail_open)
            .on_error(move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .await
            .expect("build");

        let (allowed, ctx) = verify(&gate, request(&platform, USER)).await;
        assert_eq!(allowed, fail_open);
        assert_eq!(ctx.verification().map(|v| v.ok), Some(fail_open));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty(), "error outcomes are never cached");
        assert!(platform.prompts().is_empty());
    }
}

/// Custom predicates see the request context.
#[tokio::test]
async fn test_custom_task_uses_request_context() {
    let platform = Arc::new(TestPlatform::default());
    let premium_only = CustomTask::new("https://example.com/premium", |ctx| {
        let premium = ctx.subject().and_then(|s| s.is_premium) == Some(true);
        async move { Ok(premium) }.boxed()
    });
    let gate = Gate::builder(Arc::new(TaskChecker::new(vec![
        Arc::new(premium_only) as Arc<dyn Task>
    ])))
    .build()
    .await
    .expect("build");

    let (allowed, _) = verify(&gate, request(&platform, USER)).await;
    assert!(!allowed);

    let mut subject = Subject::new(USER);
    subject.is_premium = Some(true);
    let (allowed, _) = verify(&gate, RequestContext::for_subject(subject)).await;
    assert!(allowed);
}

/// One gate serves many concurrent requests; each subject is checked once.
#[tokio::test]
async fn test_concurrent_subjects() {
    let platform = platform_with_news();
    for user_id in (1..=20).filter(|id| id % 2 == 0) {
        platform.join(NEWS, user_id);
    }
    let cache = Arc::new(MemoryCache::new());
    let gate = channel_gate(&platform, Arc::clone(&cache)).await;

    let handles: Vec<_> = (1..=20)
        .map(|user_id| {
            let gate = Arc::clone(&gate);
            let ctx = request(&platform, user_id);
            tokio::spawn(async move { (user_id, verify(&gate, ctx).await.0) })
        })
        .collect();

    for handle in handles {
        let (user_id, allowed) = handle.await.expect("join");
        assert_eq!(allowed, user_id % 2 == 0, "subject {user_id}");
    }
    assert_eq!(cache.len(), 10);
    assert_eq!(platform.member_lookups(), 20);
}
