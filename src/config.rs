//! Configuration for verification-gate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sponsor list management mode for SubGram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SponsorAction {
    /// Sponsor list is pinned to the subject for a while; re-requests re-check it.
    Subscribe,
    /// Sponsor list is rebuilt on every request.
    NewTask,
    /// Pinned until completed, then a fresh list is selected.
    Task,
}

/// Top-level settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Gate policy.
    #[serde(default)]
    pub gate: GateConfig,

    /// In-process cache. Omit to disable caching.
    #[serde(default)]
    pub cache: Option<MemoryCacheConfig>,

    /// Verification strategy.
    #[serde(default)]
    pub checker: Option<CheckerConfig>,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Gate policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Seconds a positive outcome stays cached.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Let subjects through when verification errors (fail-open).
    #[serde(default = "default_true")]
    pub fail_open: bool,

    /// Prefix of the default cache key (`<prefix><subject id>`).
    #[serde(default = "default_cache_key_prefix")]
    pub cache_key_prefix: String,
}

/// In-process cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries before LRU eviction.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Default TTL for entries written without one.
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

/// Verification strategy selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CheckerConfig {
    /// SubGram sponsor service.
    SubGram(SubGramConfig),
    /// Flyer sponsor service.
    Flyer(FlyerConfig),
}

/// SubGram checker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGramConfig {
    /// API token, sent in the `Auth` header.
    pub key: String,

    /// Service base URL.
    #[serde(default = "default_subgram_url")]
    pub base_url: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Probe the token when the gate is built.
    #[serde(default = "default_true")]
    pub verify_on_init: bool,

    /// Resource ids the service must not offer.
    #[serde(default)]
    pub exclude_resource_ids: Vec<i64>,

    /// Ad ids the service must not offer.
    #[serde(default)]
    pub exclude_ads_ids: Vec<i64>,

    /// Upper bound on sponsors per request.
    #[serde(default)]
    pub max_sponsors: Option<u32>,

    /// `true`: the bot prompts with sponsor links. `false`: the service
    /// prompts by itself. Unset: detected from each reply.
    #[serde(default)]
    pub get_links_mode: Option<bool>,

    /// Sponsor list management mode.
    #[serde(default)]
    pub action: Option<SponsorAction>,
}

/// Flyer checker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlyerConfig {
    /// API key, sent as the `key` JSON field.
    pub key: String,

    /// Service base URL.
    #[serde(default = "default_flyer_url")]
    pub base_url: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Probe the key when the gate is built.
    #[serde(default = "default_true")]
    pub verify_on_init: bool,

    /// Overrides for the message the service sends.
    #[serde(default)]
    pub message: Option<FlyerMessage>,
}

/// Message customization forwarded to Flyer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlyerMessage {
    /// Button rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    /// Message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Label for bot buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_bot: Option<String>,
    /// Label for channel buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_channel: Option<String>,
    /// Label for boost buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_boost: Option<String>,
    /// Label for URL buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_url: Option<String>,
    /// Label for the final "check" button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_fp: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            cache: Some(MemoryCacheConfig::default()),
            checker: None,
            log_level: default_log_level(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl(),
            fail_open: true,
            cache_key_prefix: default_cache_key_prefix(),
        }
    }
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_seconds: default_cache_ttl(),
        }
    }
}

impl SubGramConfig {
    /// Configuration with defaults for everything but the key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            base_url: default_subgram_url(),
            timeout_ms: default_timeout_ms(),
            verify_on_init: true,
            exclude_resource_ids: Vec::new(),
            exclude_ads_ids: Vec::new(),
            max_sponsors: None,
            get_links_mode: None,
            action: None,
        }
    }
}

impl FlyerConfig {
    /// Configuration with defaults for everything but the key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            base_url: default_flyer_url(),
            timeout_ms: default_timeout_ms(),
            verify_on_init: true,
            message: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_cache_ttl() -> u64 {
    3_600 // 1 hour
}

const fn default_true() -> bool {
    true
}

fn default_cache_key_prefix() -> String {
    "c-verif:".to_string()
}

const fn default_max_entries() -> usize {
    5_000
}

const fn default_timeout_ms() -> u64 {
    15_000
}

fn default_subgram_url() -> String {
    "https://api.subgram.org".to_string()
}

fn default_flyer_url() -> String {
    "https://api.flyerservice.io".to_string()
}

/// Default settings file location.
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "verification-gate")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("verification-gate.toml"))
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save settings to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
