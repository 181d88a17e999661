//! Thread-safe counters with a serializable snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters.
///
/// Plain counters are atomics; per-provider stats sit behind a `RwLock`.
pub struct Metrics {
    started_at: DateTime<Utc>,
    chat_requests: AtomicU64,
    context_builds: AtomicU64,
    empty_contexts: AtomicU64,
    packed_chars: AtomicU64,
    documents_uploaded: AtomicU64,
    documents_deleted: AtomicU64,
    provider_calls: AtomicU64,
    provider_failures: AtomicU64,
    fallbacks: AtomicU64,
    providers: RwLock<BTreeMap<String, ProviderStats>>,
}

/// Per-provider call and token totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    pub calls: u64,
    pub failures: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub chat_requests: u64,
    pub context_builds: u64,
    pub empty_contexts: u64,
    pub packed_chars: u64,
    pub documents_uploaded: u64,
    pub documents_deleted: u64,
    pub provider_calls: u64,
    pub provider_failures: u64,
    pub fallbacks: u64,
    pub providers: BTreeMap<String, ProviderStats>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            chat_requests: AtomicU64::new(0),
            context_builds: AtomicU64::new(0),
            empty_contexts: AtomicU64::new(0),
            packed_chars: AtomicU64::new(0),
            documents_uploaded: AtomicU64::new(0),
            documents_deleted: AtomicU64::new(0),
            provider_calls: AtomicU64::new(0),
            provider_failures: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            providers: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn record_chat_request(&self) {
        self.chat_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one context build and the characters it packed.
    pub fn record_context_build(&self, packed_chars: usize) {
        self.context_builds.fetch_add(1, Ordering::Relaxed);
        if packed_chars == 0 {
            self.empty_contexts.fetch_add(1, Ordering::Relaxed);
        }
        self.packed_chars
            .fetch_add(packed_chars as u64, Ordering::Relaxed);
    }

    pub fn record_document_uploaded(&self) {
        self.documents_uploaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_document_deleted(&self) {
        self.documents_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a successful provider call with optional token usage.
    pub fn record_provider_success(&self, provider: &str, prompt_tokens: u32, completion_tokens: u32) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
        self.with_provider(provider, |s| {
            s.calls += 1;
            s.prompt_tokens += u64::from(prompt_tokens);
            s.completion_tokens += u64::from(completion_tokens);
        });
    }

    pub fn record_provider_failure(&self, provider: &str) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
        self.with_provider(provider, |s| {
            s.calls += 1;
            s.failures += 1;
        });
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let providers = self
            .providers
            .read()
            .map(|p| p.clone())
            .unwrap_or_default();
        MetricsSnapshot {
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0),
            chat_requests: self.chat_requests.load(Ordering::Relaxed),
            context_builds: self.context_builds.load(Ordering::Relaxed),
            empty_contexts: self.empty_contexts.load(Ordering::Relaxed),
            packed_chars: self.packed_chars.load(Ordering::Relaxed),
            documents_uploaded: self.documents_uploaded.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            providers,
        }
    }

    fn with_provider(&self, provider: &str, f: impl FnOnce(&mut ProviderStats)) {
        // A poisoned lock only loses per-provider detail; totals stay exact.
        if let Ok(mut map) = self.providers.write() {
            f(map.entry(provider.to_string()).or_default());
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
