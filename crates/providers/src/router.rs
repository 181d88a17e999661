//! Provider router: picks a target per request and builds its fallback chain.
//!
//! Model selection is a plain keyword table. It is kept apart from context
//! building so either can change without touching the other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ragpack_config::{AppConfig, RouteTarget, RoutingConfig};
use ragpack_core::error::ProviderError;
use ragpack_core::provider::Provider;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fallback::{FallbackProvider, Target};
use crate::openai_compat::OpenAiCompatProvider;

/// Which configured target serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    Primary,
    Secondary,
}

impl ModelChoice {
    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// Pick a target for `query`.
///
/// An explicit choice always wins. Otherwise any keyword found in the
/// lowercased query selects `Secondary`.
pub fn classify(query: &str, explicit: Option<ModelChoice>, keywords: &[String]) -> ModelChoice {
    if let Some(choice) = explicit {
        return choice;
    }
    let q = query.to_lowercase();
    let hit = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .any(|k| !k.is_empty() && q.contains(&k));
    if hit {
        ModelChoice::Secondary
    } else {
        ModelChoice::Primary
    }
}

/// Parse a request's model selector.
///
/// `"auto"` (or empty) means no explicit choice. `"primary"` and
/// `"secondary"` select directly; a configured provider or model name
/// selects the target that uses it.
pub fn parse_model_choice(
    value: &str,
    routing: &RoutingConfig,
) -> Result<Option<ModelChoice>, String> {
    let v = value.trim().to_lowercase();
    match v.as_str() {
        "" | "auto" => return Ok(None),
        "primary" => return Ok(Some(ModelChoice::Primary)),
        "secondary" => return Ok(Some(ModelChoice::Secondary)),
        _ => {}
    }

    let matches = |t: &RouteTarget| t.provider.eq_ignore_ascii_case(&v) || t.model.eq_ignore_ascii_case(&v);
    if matches(&routing.primary) {
        Ok(Some(ModelChoice::Primary))
    } else if matches(&routing.secondary) {
        Ok(Some(ModelChoice::Secondary))
    } else {
        Err(format!(
            "Unknown model '{value}'. Use auto, primary, secondary, or a configured provider/model"
        ))
    }
}

/// Routes requests to registered providers.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    routing: RoutingConfig,
}

impl ProviderRouter {
    pub fn new(routing: RoutingConfig) -> Self {
        Self {
            providers: HashMap::new(),
            routing,
        }
    }

    /// Register a provider under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn classify(&self, query: &str, explicit: Option<ModelChoice>) -> ModelChoice {
        classify(query, explicit, &self.routing.keywords)
    }

    pub fn target_config(&self, choice: ModelChoice) -> &RouteTarget {
        match choice {
            ModelChoice::Primary => &self.routing.primary,
            ModelChoice::Secondary => &self.routing.secondary,
        }
    }

    fn target(&self, choice: ModelChoice) -> Result<Target, ProviderError> {
        let cfg = self.target_config(choice);
        let provider = self.get(&cfg.provider).ok_or_else(|| {
            ProviderError::NotConfigured(format!("provider '{}' is not registered", cfg.provider))
        })?;
        Ok(Target::new(provider, cfg.model.clone()))
    }

    /// The chosen target, plus the other one as fallback when enabled and
    /// distinct.
    pub fn chain(&self, choice: ModelChoice) -> Result<FallbackProvider, ProviderError> {
        let timeout = Duration::from_secs(self.routing.timeout_secs);
        let mut chain = FallbackProvider::new(self.target(choice)?, timeout);

        let other = choice.other();
        if self.routing.fallback && self.target_config(other) != self.target_config(choice) {
            match self.target(other) {
                Ok(t) => chain = chain.with_fallback(t),
                Err(e) => debug!(error = %e, "No fallback target available"),
            }
        }
        Ok(chain)
    }
}

/// Build providers from configuration.
///
/// Every `[providers.<name>]` entry is registered, then the two routing
/// targets are registered with defaults if they were not listed.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(config.routing.clone());

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();
        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        let provider = OpenAiCompatProvider::new(name, &base_url, &api_key);
        debug!(provider = %name, base_url = %provider.base_url(), "Registered provider");
        router.register(name.clone(), Arc::new(provider));
    }

    for target in [&config.routing.primary, &config.routing.secondary] {
        if router.get(&target.provider).is_none() {
            let api_key = config.api_key.clone().unwrap_or_default();
            let base_url = default_base_url(&target.provider);
            let provider = OpenAiCompatProvider::new(&target.provider, &base_url, &api_key);
            debug!(provider = %target.provider, base_url = %provider.base_url(), "Registered routing target");
            router.register(target.provider.clone(), Arc::new(provider));
        }
    }

    router
}

/// Default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragpack_config::ProviderConfig;

    fn keywords() -> Vec<String> {
        RoutingConfig::default().keywords
    }

    #[test]
    fn explicit_choice_wins() {
        assert_eq!(
            classify("please analyze this", Some(ModelChoice::Primary), &keywords()),
            ModelChoice::Primary
        );
        assert_eq!(
            classify("hi", Some(ModelChoice::Secondary), &keywords()),
            ModelChoice::Secondary
        );
    }

    #[test]
    fn keyword_routes_to_secondary() {
        assert_eq!(classify("Can you ANALYZE my invoice?", None, &keywords()), ModelChoice::Secondary);
        assert_eq!(classify("Bunu detaylı anlat", None, &keywords()), ModelChoice::Secondary);
        assert_eq!(classify("Where is my order?", None, &keywords()), ModelChoice::Primary);
    }

    #[test]
    fn keyword_match_is_substring() {
        // "kod" inside "kodu"
        assert_eq!(classify("indirim kodu nedir", None, &keywords()), ModelChoice::Secondary);
        assert_eq!(classify("anything", None, &[]), ModelChoice::Primary);
    }

    #[test]
    fn parse_selectors() {
        let routing = RoutingConfig {
            primary: RouteTarget {
                provider: "openai".into(),
                model: "gpt-4o-mini".into(),
            },
            secondary: RouteTarget {
                provider: "groq".into(),
                model: "llama-3.1-70b".into(),
            },
            ..RoutingConfig::default()
        };

        assert_eq!(parse_model_choice("auto", &routing), Ok(None));
        assert_eq!(parse_model_choice("", &routing), Ok(None));
        assert_eq!(parse_model_choice("Primary", &routing), Ok(Some(ModelChoice::Primary)));
        assert_eq!(parse_model_choice("secondary", &routing), Ok(Some(ModelChoice::Secondary)));
        assert_eq!(parse_model_choice("openai", &routing), Ok(Some(ModelChoice::Primary)));
        assert_eq!(parse_model_choice("groq", &routing), Ok(Some(ModelChoice::Secondary)));
        assert_eq!(
            parse_model_choice("llama-3.1-70b", &routing),
            Ok(Some(ModelChoice::Secondary))
        );
        assert!(parse_model_choice("claude", &routing).is_err());
    }

    #[test]
    fn build_from_default_config_registers_targets() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        assert!(router.get("openai").is_some());
        assert_eq!(router.list(), vec!["openai"]);
    }

    #[test]
    fn configured_providers_are_registered() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://gpu-box:11434/v1".into()),
            },
        );
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["ollama", "openai"]);
    }

    #[test]
    fn chain_has_fallback_when_targets_differ() {
        let router = build_from_config(&AppConfig::default());
        let chain = router.chain(ModelChoice::Primary).unwrap();
        assert!(chain.has_fallback());
        assert_eq!(chain.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn chain_without_fallback_when_disabled_or_identical() {
        let mut config = AppConfig::default();
        config.routing.fallback = false;
        let router = build_from_config(&config);
        assert!(!router.chain(ModelChoice::Primary).unwrap().has_fallback());

        let mut config = AppConfig::default();
        config.routing.secondary = config.routing.primary.clone();
        let router = build_from_config(&config);
        assert!(!router.chain(ModelChoice::Secondary).unwrap().has_fallback());
    }

    #[test]
    fn unregistered_provider_is_not_configured() {
        let router = ProviderRouter::new(RoutingConfig::default());
        assert!(matches!(
            router.chain(ModelChoice::Primary),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
        assert!(default_base_url("groq").contains("api.groq.com"));
    }

    #[test]
    fn routing_targets_get_default_endpoints() {
        let mut config = AppConfig::default();
        config.routing.secondary = RouteTarget {
            provider: "groq".into(),
            model: "llama-3.1-70b".into(),
        };
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["groq", "openai"]);
        assert_eq!(router.get("groq").unwrap().name(), "groq");
    }
}
