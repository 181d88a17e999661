//! Configuration loading, validation, and management for ragpack.
//!
//! Loads configuration from `~/.ragpack/config.toml` with environment
//! variable overrides. Validates all settings at startup, including the
//! chunking geometry the retrieval pipeline depends on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragpack/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Base system prompt; packed document context is appended to it
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Chunking, scoring and packing tunables
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Model routing and fallback
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_system_prompt() -> String {
    "You are a helpful bilingual assistant. Answer in the language of the question.".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("system_prompt", &self.system_prompt)
            .field("retrieval", &self.retrieval)
            .field("store", &self.store)
            .field("routing", &self.routing)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bearer_tokens", &format!("[{} REDACTED]", self.bearer_tokens.len()))
            .field("max_body_bytes", &self.max_body_bytes)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

// ── Retrieval ─────────────────────────────────────────────────────────────

/// Tunables for tokenizing, chunking, scoring and packing.
///
/// The defaults were tuned by trial; every one of them can be overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum chunk length in characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Characters carried from one chunk into the next; must be < `max_chars`
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,

    /// How many ranked chunks the packer may consider
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Character budget of the packed context
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Most recent usable documents considered per query
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,

    /// Flat score added when the whole query appears verbatim
    #[serde(default = "default_phrase_bonus")]
    pub phrase_bonus: f64,

    /// Minimum trimmed query length (characters) for the phrase bonus
    #[serde(default = "default_min_phrase_chars")]
    pub min_phrase_chars: usize,

    /// Function words dropped by the tokenizer
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,

    /// Additional stopwords appended to `stopwords`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_stopwords: Vec<String>,
}

fn default_max_chars() -> usize {
    1200
}
fn default_overlap_chars() -> usize {
    200
}
fn default_top_k() -> usize {
    6
}
fn default_max_context_chars() -> usize {
    4500
}
fn default_max_documents() -> usize {
    20
}
fn default_phrase_bonus() -> f64 {
    5.0
}
fn default_min_phrase_chars() -> usize {
    8
}

/// Turkish and English function words.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    // Turkish
    "ve", "veya", "ile", "bir", "bu", "şu", "o", "da", "de", "ki", "mi", "mı", "mu", "mü",
    "için", "gibi", "çok", "daha", "en", "ne", "ama", "fakat", "ya", "hem", "her", "olan",
    "olarak", "ise", "kadar", "sonra", "önce", "nasıl", "neden", "var", "yok",
    // English
    "the", "a", "an", "and", "or", "of", "to", "in", "on", "at", "for", "with", "is", "are",
    "was", "were", "be", "by", "it", "this", "that", "as", "from", "what", "how", "do", "does",
];

fn default_stopwords() -> Vec<String> {
    DEFAULT_STOPWORDS.iter().map(|s| (*s).to_string()).collect()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
            max_documents: default_max_documents(),
            phrase_bonus: default_phrase_bonus(),
            min_phrase_chars: default_min_phrase_chars(),
            stopwords: default_stopwords(),
            extra_stopwords: vec![],
        }
    }
}

impl RetrievalConfig {
    /// Validate the chunking geometry and packing limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.max_chars must be > 0".into(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(ConfigError::ValidationError(format!(
                "retrieval.overlap_chars ({}) must be smaller than retrieval.max_chars ({})",
                self.overlap_chars, self.max_chars
            )));
        }
        if self.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be > 0".into(),
            ));
        }
        if self.max_context_chars == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.max_context_chars must be > 0".into(),
            ));
        }
        if self.max_documents == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.max_documents must be > 0".into(),
            ));
        }
        if !self.phrase_bonus.is_finite() || self.phrase_bonus < 0.0 {
            return Err(ConfigError::ValidationError(
                "retrieval.phrase_bonus must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    /// `stopwords` plus `extra_stopwords`, lowercased.
    pub fn all_stopwords(&self) -> impl Iterator<Item = String> + '_ {
        self.stopwords
            .iter()
            .chain(self.extra_stopwords.iter())
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
    }
}

// ── Store ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum stored documents; the oldest is evicted beyond this
    #[serde(default = "default_store_capacity")]
    pub capacity: usize,
}

fn default_store_capacity() -> usize {
    500
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: default_store_capacity(),
        }
    }
}

// ── Routing ───────────────────────────────────────────────────────────────

/// A provider + model pair a query can be routed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Default target
    #[serde(default = "default_primary")]
    pub primary: RouteTarget,

    /// Target for queries matching `keywords`, and the fallback for primary
    #[serde(default = "default_secondary")]
    pub secondary: RouteTarget,

    /// Query substrings (case-insensitive) that route to `secondary`
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Retry once on the other target when the chosen one fails
    #[serde(default = "default_true")]
    pub fallback: bool,

    /// Per-attempt timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_primary() -> RouteTarget {
    RouteTarget {
        provider: "openai".into(),
        model: "gpt-4o-mini".into(),
    }
}
fn default_secondary() -> RouteTarget {
    RouteTarget {
        provider: "openai".into(),
        model: "gpt-4o".into(),
    }
}
fn default_keywords() -> Vec<String> {
    [
        "analyze", "analiz", "compare", "karşılaştır", "explain in detail", "detaylı",
        "code", "kod",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            keywords: default_keywords(),
            fallback: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Gateway ───────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Accepted bearer tokens for `/v1`; empty disables the check
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bearer_tokens: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Browser origins allowed by CORS; empty allows none
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    8088
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            bearer_tokens: vec![],
            max_body_bytes: default_max_body_bytes(),
            cors_origins: vec![],
        }
    }
}

// ── Providers ─────────────────────────────────────────────────────────────

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.ragpack/config.toml).
    ///
    /// Also checks environment variables:
    /// - `RAGPACK_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `RAGPACK_PROVIDER` / `RAGPACK_MODEL` override the primary route
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("RAGPACK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("RAGPACK_PROVIDER") {
            config.routing.primary.provider = provider;
        }

        if let Ok(model) = std::env::var("RAGPACK_MODEL") {
            config.routing.primary.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragpack")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        self.retrieval.validate()?;

        if self.store.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "store.capacity must be > 0".into(),
            ));
        }

        if self.routing.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "routing.timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some() || self.providers.values().any(|p| p.api_key.is_some())
    }

    /// A copy with API keys and bearer tokens masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |k: &Option<String>| k.as_ref().map(|_| "[REDACTED]".to_string());
        let mut copy = self.clone();
        copy.api_key = mask(&self.api_key);
        for provider in copy.providers.values_mut() {
            provider.api_key = mask(&provider.api_key);
        }
        copy.gateway.bearer_tokens = self
            .gateway
            .bearer_tokens
            .iter()
            .map(|_| "[REDACTED]".to_string())
            .collect();
        copy
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
            retrieval: RetrievalConfig::default(),
            store: StoreConfig::default(),
            routing: RoutingConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
