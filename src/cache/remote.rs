//! Pass-through cache over a remote key/value service.
//!
//! Wraps any client exposing native get and set-with-expiry primitives.
//! Transport errors are propagated unchanged; retry policy belongs to the
//! client.

use crate::cache::CacheAdapter;
use crate::error::Result;
use async_trait::async_trait;

/// Minimal surface of a remote key/value client (Redis-style `GET`/`SETEX`).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `GET key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// `SETEX key ttl value`.
    async fn set_ex(&self, key: &str, ttl_seconds: u64, value: &str) -> Result<()>;
}

/// Cache adapter backed by a remote [`KeyValueStore`].
pub struct RemoteCache<S> {
    client: S,
}

impl<S: KeyValueStore> RemoteCache<S> {
    /// Wrap a remote client.
    #[must_use]
    pub fn new(client: S) -> Self {
        Self { client }
    }

    /// Access the underlying client.
    #[must_use]
    pub fn client(&self) -> &S {
        &self.client
    }
}

#[async_trait]
impl<S: KeyValueStore> CacheAdapter for RemoteCache<S> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.client.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, ttl_seconds: u64, value: &str) -> Result<()> {
        self.client.set_ex(key, ttl_seconds, value).await
    }
}
