//! SubGram and Flyer checkers against the stub service.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::{StubService, TestPlatform};
use serde_json::{json, Value};
use std::sync::Arc;
use verification_gate::platform::PlatformApi;
use verification_gate::{
    Error, FlyerChecker, FlyerConfig, Gate, MemoryCache, RequestContext, Subject, SubGramChecker,
    SubGramConfig,
};

const USER: i64 = 42;

fn subgram_config(stub: &StubService) -> SubGramConfig {
    SubGramConfig {
        base_url: stub.base_url(),
        timeout_ms: 300,
        ..SubGramConfig::new("sg-key")
    }
}

fn flyer_config(stub: &StubService) -> FlyerConfig {
    FlyerConfig {
        base_url: stub.base_url(),
        timeout_ms: 300,
        verify_on_init: false,
        ..FlyerConfig::new("fl-key")
    }
}

fn request(platform: &Arc<TestPlatform>) -> RequestContext {
    RequestContext::for_subject(
        Subject::new(USER)
            .with_language("de")
            .with_first_name("Grace"),
    )
    .with_chat(USER)
    .with_api(Arc::clone(platform) as Arc<dyn PlatformApi>)
}

async fn subgram_gate(
    stub: &StubService,
    config: SubGramConfig,
    cache: Arc<MemoryCache>,
) -> Arc<Gate> {
    stub.reply_json(
        "/get-balance",
        200,
        json!({"status": "ok", "code": 200, "balance": 10}),
    );
    let checker = SubGramChecker::new(config).expect("client");
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

fn meta_error(ctx: &RequestContext) -> Option<String> {
    ctx.verification()?
        .meta
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
}

// =========================================================================
// SubGram
// =========================================================================

#[tokio::test]
async fn test_subgram_init_sends_auth_header() {
    let stub = StubService::start().await.expect("stub");
    let _gate = subgram_gate(&stub, subgram_config(&stub), Arc::new(MemoryCache::new())).await;

    let probes = stub.requests("/get-balance");
    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].auth.as_deref(), Some("sg-key"));
}

#[tokio::test]
async fn test_subgram_init_rejects_invalid_key() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_json(
        "/get-balance",
        401,
        json!({"status": "error", "code": 401, "message": "Unauthorized"}),
    );
    let checker = SubGramChecker::new(subgram_config(&stub)).expect("client");

    match Gate::builder(Arc::new(checker)).build().await {
        Err(Error::CheckerInit { checker, source }) => {
            assert_eq!(checker, "subgram");
            assert!(matches!(*source, Error::InvalidCredential(_)));
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("gate must not build with a rejected key"),
    }
}

#[tokio::test]
async fn test_subgram_init_tolerates_outage() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_raw("/get-balance", 503, "Service Unavailable");
    let checker = SubGramChecker::new(subgram_config(&stub)).expect("client");
    assert!(Gate::builder(Arc::new(checker)).build().await.is_ok());

    stub.stall("/get-balance");
    let checker = SubGramChecker::new(subgram_config(&stub)).expect("client");
    assert!(Gate::builder(Arc::new(checker)).build().await.is_ok());
}

#[tokio::test]
async fn test_subgram_pass_is_cached() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_json("/get-sponsors", 200, json!({"status": "ok", "code": 200}));
    let cache = Arc::new(MemoryCache::new());
    let gate = subgram_gate(&stub, subgram_config(&stub), Arc::clone(&cache)).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, _) = verify(&gate, request(&platform)).await;
    assert!(allowed);
    let (allowed, _) = verify(&gate, request(&platform)).await;
    assert!(allowed);

    assert_eq!(stub.calls("/get-sponsors"), 1);
    assert_eq!(cache.lookup(&format!("c-verif:{USER}")).as_deref(), Some("1"));

    let sent = &stub.requests("/get-sponsors")[0];
    assert_eq!(sent.auth.as_deref(), Some("sg-key"));
    assert_eq!(sent.body["user_id"], json!(USER));
    assert_eq!(sent.body["chat_id"], json!(USER));
    assert_eq!(sent.body["language_code"], json!("de"));
    assert_eq!(sent.body["first_name"], json!("Grace"));
}

/// HTTP 500 from the service: let the subject through, record why, cache nothing.
#[tokio::test]
async fn test_subgram_server_error_fails_open() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_raw("/get-sponsors", 500, "Internal Server Error");
    let cache = Arc::new(MemoryCache::new());
    let gate = subgram_gate(&stub, subgram_config(&stub), Arc::clone(&cache)).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, ctx) = verify(&gate, request(&platform)).await;

    assert!(allowed);
    assert_eq!(meta_error(&ctx).as_deref(), Some("Internal Server Error"));
    assert!(cache.is_empty());

    // Not cached, so the next request asks again
    let (allowed, _) = verify(&gate, request(&platform)).await;
    assert!(allowed);
    assert_eq!(stub.calls("/get-sponsors"), 2);
}

#[tokio::test]
async fn test_subgram_error_status_fails_open() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_json(
        "/get-sponsors",
        200,
        json!({"status": "error", "code": 404, "message": "Bot not found"}),
    );
    let cache = Arc::new(MemoryCache::new());
    let gate = subgram_gate(&stub, subgram_config(&stub), Arc::clone(&cache)).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, ctx) = verify(&gate, request(&platform)).await;

    assert!(allowed);
    assert_eq!(meta_error(&ctx).as_deref(), Some("Bot not found"));
    assert!(cache.is_empty());
}

/// Pending sponsors in hosted-prompt mode: blocked, no local tasks or prompt.
#[tokio::test]
async fn test_subgram_turnkey_warning_blocks_without_tasks() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_json(
        "/get-sponsors",
        200,
        json!({
            "status": "warning",
            "code": 200,
            "result": {"sponsors": [
                {"link": "https://t.me/s1", "status": "unsubscribed", "available_now": true},
                {"link": "https://t.me/s2", "status": "unsubscribed", "available_now": true}
            ]}
        }),
    );
    let cache = Arc::new(MemoryCache::new());
    let gate = subgram_gate(&stub, subgram_config(&stub), Arc::clone(&cache)).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, ctx) = verify(&gate, request(&platform)).await;

    assert!(!allowed);
    assert!(ctx.verification().expect("outcome").tasks.is_none());
    assert!(platform.prompts().is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_subgram_get_links_warning_prompts_sponsors() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_json(
        "/get-sponsors",
        200,
        json!({
            "status": "warning",
            "code": 200,
            "additional": {"sponsors": [
                {"link": "https://t.me/s1", "button_text": "Sponsor one", "status": "unsubscribed", "available_now": true},
                {"link": "https://t.me/s2", "status": "subscribed", "available_now": true},
                {"link": "https://t.me/s3", "status": "unsubscribed", "available_now": true}
            ]}
        }),
    );
    let gate = subgram_gate(&stub, subgram_config(&stub), Arc::new(MemoryCache::new())).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, ctx) = verify(&gate, request(&platform)).await;

    assert!(!allowed);
    assert_eq!(
        ctx.verification().expect("outcome").task_targets(),
        vec!["https://t.me/s1".to_string(), "https://t.me/s3".to_string()]
    );
    let prompts = platform.prompts();
    assert_eq!(prompts.len(), 1);
    let labels: Vec<&str> = prompts[0].1.buttons.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["Sponsor one", "Subscribe"]);
}

/// Unreachable service: block, and do not prompt.
#[tokio::test]
async fn test_subgram_timeout_fails_closed() {
    let stub = StubService::start().await.expect("stub");
    stub.stall("/get-sponsors");
    let cache = Arc::new(MemoryCache::new());
    let gate = subgram_gate(&stub, subgram_config(&stub), Arc::clone(&cache)).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, ctx) = verify(&gate, request(&platform)).await;

    assert!(!allowed);
    assert_eq!(meta_error(&ctx).as_deref(), Some("subgram_request_failed"));
    assert!(ctx.verification().expect("outcome").tasks.is_none());
    assert!(platform.prompts().is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_subgram_malformed_reply_fails_closed() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_raw("/get-sponsors", 200, "<html>maintenance</html>");
    let gate = subgram_gate(&stub, subgram_config(&stub), Arc::new(MemoryCache::new())).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, ctx) = verify(&gate, request(&platform)).await;

    assert!(!allowed);
    assert_eq!(meta_error(&ctx).as_deref(), Some("subgram_request_failed"));
}

#[tokio::test]
async fn test_subgram_skips_requests_without_chat() {
    let stub = StubService::start().await.expect("stub");
    let cache = Arc::new(MemoryCache::new());
    let gate = subgram_gate(&stub, subgram_config(&stub), Arc::clone(&cache)).await;

    let (allowed, _) = verify(&gate, RequestContext::for_subject(Subject::new(USER))).await;

    assert!(allowed);
    assert_eq!(stub.calls("/get-sponsors"), 0);
    assert!(cache.is_empty());
}

// =========================================================================
// Flyer
// =========================================================================

async fn flyer_gate(config: FlyerConfig, cache: Arc<MemoryCache>) -> Arc<Gate> {
    let checker = FlyerChecker::new(config).expect("client");
    Gate::builder(Arc::new(checker))
        .cache(cache)
        .build()
        .await
        .expect("Failed to build gate")
}

#[tokio::test]
async fn test_flyer_init_verifies_key() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_json("/get_me", 200, json!({"status": true, "result": {"bot": "x"}}));
    let config = FlyerConfig {
        verify_on_init: true,
        ..flyer_config(&stub)
    };
    let _gate = flyer_gate(config, Arc::new(MemoryCache::new())).await;

    let probes = stub.requests("/get_me");
    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].body["key"], json!("fl-key"));
    assert!(probes[0].auth.is_none());
}

#[tokio::test]
async fn test_flyer_init_rejects_invalid_key() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_json("/get_me", 200, json!({"status": false, "error": "Invalid key"}));
    let config = FlyerConfig {
        verify_on_init: true,
        ..flyer_config(&stub)
    };
    let checker = FlyerChecker::new(config).expect("client");

    let result = Gate::builder(Arc::new(checker)).build().await;
    assert!(matches!(
        result,
        Err(Error::CheckerInit { checker: "flyer", .. })
    ));
}

#[tokio::test]
async fn test_flyer_skip_passes_and_caches() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_json("/check", 200, json!({"skip": true}));
    let cache = Arc::new(MemoryCache::new());
    let gate = flyer_gate(flyer_config(&stub), Arc::clone(&cache)).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, _) = verify(&gate, request(&platform)).await;
    assert!(allowed);
    let (allowed, _) = verify(&gate, request(&platform)).await;
    assert!(allowed);

    assert_eq!(stub.calls("/check"), 1);
    let sent = &stub.requests("/check")[0];
    assert_eq!(sent.body["key"], json!("fl-key"));
    assert_eq!(sent.body["user_id"], json!(USER));
    assert_eq!(sent.body["language_code"], json!("de"));
}

/// Pending tasks in hosted-prompt mode: blocked, no local tasks or prompt.
#[tokio::test]
async fn test_flyer_pending_tasks_block_without_tasks() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_json("/check", 200, json!({"skip": false, "tasks": 2}));
    let cache = Arc::new(MemoryCache::new());
    let gate = flyer_gate(flyer_config(&stub), Arc::clone(&cache)).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, ctx) = verify(&gate, request(&platform)).await;

    assert!(!allowed);
    assert!(ctx.verification().expect("outcome").tasks.is_none());
    assert!(platform.prompts().is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_flyer_error_reply_fails_open() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_json("/check", 200, json!({"error": "Quota exceeded"}));
    let cache = Arc::new(MemoryCache::new());
    let gate = flyer_gate(flyer_config(&stub), Arc::clone(&cache)).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, ctx) = verify(&gate, request(&platform)).await;

    assert!(allowed);
    assert_eq!(meta_error(&ctx).as_deref(), Some("Quota exceeded"));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_flyer_server_error_fails_open() {
    let stub = StubService::start().await.expect("stub");
    stub.reply_raw("/check", 502, "Bad Gateway");
    let cache = Arc::new(MemoryCache::new());
    let gate = flyer_gate(flyer_config(&stub), Arc::clone(&cache)).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, ctx) = verify(&gate, request(&platform)).await;

    assert!(allowed);
    assert_eq!(meta_error(&ctx).as_deref(), Some("Bad Gateway"));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_flyer_timeout_fails_closed() {
    let stub = StubService::start().await.expect("stub");
    stub.stall("/check");
    let gate = flyer_gate(flyer_config(&stub), Arc::new(MemoryCache::new())).await;
    let platform = Arc::new(TestPlatform::default());

    let (allowed, ctx) = verify(&gate, request(&platform)).await;

    assert!(!allowed);
    assert_eq!(meta_error(&ctx).as_deref(), Some("flyer_request_failed"));
}
