//! Cross-request caching of positive verification outcomes.
//!
//! Only the [`VERIFIED_SENTINEL`] is ever written. Negative outcomes are
//! never cached, so every blocked request is re-evaluated.
//!
//! ```text
//! verify_tasks()
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ get(key)            │
//! └─────────┬───────────┘
//!           │
//!    ┌──────┴──────┐
//!    │             │
//!  SENTINEL    ABSENT/EXPIRED
//!    │             │
//!    ▼             ▼
//!   PASS      run checker
//!                  │
//!           ┌──────┴──────┐
//!           │             │
//!          OK          BLOCKED
//!           │             │
//!           ▼             ▼
//!  set_with_ttl(key)   not cached
//! ```

mod memory;
mod remote;

pub use memory::{CacheStats, MemoryCache};
pub use remote::{KeyValueStore, RemoteCache};

use crate::error::Result;
use async_trait::async_trait;

/// Value stored for a subject that passed verification.
pub const VERIFIED_SENTINEL: &str = "1";

/// Key/value store with per-entry TTL.
///
/// Absence and expiry must look identical to callers.
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// Fetch a value. Returns `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value that expires after `ttl_seconds`.
    async fn set_with_ttl(&self, key: &str, ttl_seconds: u64, value: &str) -> Result<()>;
}
