//! Provider fallback: the chosen target, then at most one fallback target.
//!
//! Each attempt runs under the same timeout. There is no backoff and no
//! circuit breaker; a failed or timed-out first attempt goes straight to the
//! fallback, and the fallback's error is returned if it fails too.

use async_trait::async_trait;
use ragpack_core::error::ProviderError;
use ragpack_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider paired with the model to request from it.
#[derive(Clone)]
pub struct Target {
    pub provider: Arc<dyn Provider>,
    pub model: String,
}

impl Target {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

/// A successful response plus how it was obtained.
#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    pub response: ProviderResponse,
    /// Name of the provider that answered
    pub provider: String,
    /// Whether the first target failed and the fallback answered
    pub fallback_used: bool,
    /// Attempts that failed before the answer (0 or 1)
    pub failed_attempts: usize,
}

/// Ordered two-step attempt chain.
pub struct FallbackProvider {
    name: String,
    primary: Target,
    fallback: Option<Target>,
    timeout: Duration,
}

impl FallbackProvider {
    /// Single-target chain; add a second with [`with_fallback`](Self::with_fallback).
    pub fn new(primary: Target, timeout: Duration) -> Self {
        Self {
            name: format!("fallback({})", primary.provider_name()),
            primary,
            fallback: None,
            timeout,
        }
    }

    /// Set (or replace) the fallback target.
    pub fn with_fallback(mut self, target: Target) -> Self {
        self.fallback = Some(target);
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the chain, reporting which target answered.
    pub async fn execute(&self, request: ProviderRequest) -> Result<FallbackOutcome, ProviderError> {
        let first = match self.attempt(&self.primary, request.clone(), 1).await {
            Ok(response) => {
                return Ok(FallbackOutcome {
                    response,
                    provider: self.primary.provider_name().to_string(),
                    fallback_used: false,
                    failed_attempts: 0,
                });
            }
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(first);
        };

        let response = self.attempt(fallback, request, 2).await?;
        info!(
            provider = %fallback.provider_name(),
            model = %fallback.model,
            "Fallback: secondary target answered"
        );
        Ok(FallbackOutcome {
            response,
            provider: fallback.provider_name().to_string(),
            fallback_used: true,
            failed_attempts: 1,
        })
    }

    async fn attempt(
        &self,
        target: &Target,
        mut request: ProviderRequest,
        attempt: usize,
    ) -> Result<ProviderResponse, ProviderError> {
        let provider_name = target.provider_name();
        request.model = target.model.clone();

        info!(
            provider = %provider_name,
            model = %target.model,
            attempt,
            "Fallback: trying provider"
        );

        match tokio::time::timeout(self.timeout, target.provider.complete(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                warn!(provider = %provider_name, error = %e, "Fallback: provider failed");
                Err(e)
            }
            Err(_) => {
                warn!(
                    provider = %provider_name,
                    timeout_secs = self.timeout.as_secs(),
                    "Fallback: provider timed out"
                );
                Err(ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    provider_name,
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        self.execute(request).await.map(|o| o.response)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        if let Ok(true) = self.primary.provider.health_check().await {
            return Ok(true);
        }
        match &self.fallback {
            Some(t) => Ok(matches!(t.provider.health_check().await, Ok(true))),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragpack_core::message::Message;
    use std::sync::Mutex;

    /// A mock provider that always fails.
    struct FailingProvider {
        name: String,
        error: ProviderError,
        call_count: Mutex<usize>,
    }

    impl FailingProvider {
        fn new(name: &str, error: ProviderError) -> Self {
            Self {
                name: name.into(),
                error,
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            Err(self.error.clone())
        }
    }

    /// A mock provider that echoes the requested model.
    struct SuccessProvider {
        name: String,
        call_count: Mutex<usize>,
    }

    impl SuccessProvider {
        fn new(name: &str) -> Self {
            Self {
                name: name.into(),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for SuccessProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            Ok(ProviderResponse {
                message: Message::assistant(format!("answer from {}", self.name)),
                usage: None,
                model: request.model,
            })
        }
    }

    /// Never answers (for timeout testing).
    struct HangingProvider;

    #[async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn test_request() -> ProviderRequest {
        ProviderRequest {
            model: "unset".into(),
            messages: vec![Message::user("hello")],
            temperature: 0.3,
            max_tokens: None,
        }
    }

    const LONG: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn primary_succeeds() {
        let p1 = Arc::new(SuccessProvider::new("openai"));
        let p2 = Arc::new(SuccessProvider::new("groq"));

        let chain = FallbackProvider::new(Target::new(p1.clone(), "gpt-4o-mini"), LONG)
            .with_fallback(Target::new(p2.clone(), "llama-3.1-8b"));

        let outcome = chain.execute(test_request()).await.unwrap();
        assert_eq!(outcome.provider, "openai");
        assert_eq!(outcome.response.model, "gpt-4o-mini");
        assert!(!outcome.fallback_used);
        assert_eq!(outcome.failed_attempts, 0);

        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_on_failure() {
        let p1 = Arc::new(FailingProvider::new(
            "openai",
            ProviderError::ApiError {
                status_code: 500,
                message: "Internal Server Error".into(),
            },
        ));
        let p2 = Arc::new(SuccessProvider::new("groq"));

        let chain = FallbackProvider::new(Target::new(p1.clone(), "gpt-4o"), LONG)
            .with_fallback(Target::new(p2.clone(), "llama-3.1-8b"));

        let outcome = chain.execute(test_request()).await.unwrap();
        assert_eq!(outcome.provider, "groq");
        assert_eq!(outcome.response.model, "llama-3.1-8b");
        assert!(outcome.fallback_used);
        assert_eq!(outcome.failed_attempts, 1);

        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn falls_back_on_rate_limit() {
        let p1 = Arc::new(FailingProvider::new(
            "openai",
            ProviderError::RateLimited {
                retry_after_secs: 60,
            },
        ));
        let p2 = Arc::new(SuccessProvider::new("groq"));

        let chain = FallbackProvider::new(Target::new(p1.clone(), "a"), LONG)
            .with_fallback(Target::new(p2.clone(), "b"));

        assert!(chain.complete(test_request()).await.is_ok());
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn both_fail_returns_fallback_error() {
        let p1 = Arc::new(FailingProvider::new(
            "openai",
            ProviderError::Network("conn refused".into()),
        ));
        let p2 = Arc::new(FailingProvider::new(
            "groq",
            ProviderError::AuthenticationFailed("bad key".into()),
        ));

        let chain = FallbackProvider::new(Target::new(p1.clone(), "a"), LONG)
            .with_fallback(Target::new(p2.clone(), "b"));

        match chain.execute(test_request()).await.unwrap_err() {
            ProviderError::AuthenticationFailed(_) => {}
            other => panic!("Expected AuthenticationFailed, got: {other:?}"),
        }
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn no_fallback_means_single_attempt() {
        let p1 = Arc::new(FailingProvider::new(
            "openai",
            ProviderError::Network("down".into()),
        ));
        let chain = FallbackProvider::new(Target::new(p1.clone(), "a"), LONG);

        assert!(!chain.has_fallback());
        assert!(matches!(
            chain.execute(test_request()).await,
            Err(ProviderError::Network(_))
        ));
        assert_eq!(p1.calls(), 1);
    }

    #[tokio::test]
    async fn timeout_triggers_fallback() {
        let p2 = Arc::new(SuccessProvider::new("groq"));
        let chain = FallbackProvider::new(
            Target::new(Arc::new(HangingProvider), "slow"),
            Duration::from_millis(50),
        )
        .with_fallback(Target::new(p2.clone(), "fast"));

        let outcome = chain.execute(test_request()).await.unwrap();
        assert!(outcome.fallback_used);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn timeout_without_fallback_is_timeout_error() {
        let chain = FallbackProvider::new(
            Target::new(Arc::new(HangingProvider), "slow"),
            Duration::from_millis(20),
        );
        assert!(matches!(
            chain.execute(test_request()).await,
            Err(ProviderError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn health_check_any_healthy() {
        let p1 = Arc::new(FailingProvider::new(
            "bad",
            ProviderError::Network("down".into()),
        ));
        let p2 = Arc::new(SuccessProvider::new("good"));

        let chain = FallbackProvider::new(Target::new(p1, "a"), LONG)
            .with_fallback(Target::new(p2, "b"));

        // default health_check returns Ok(true) for both mocks
        assert!(chain.health_check().await.unwrap());
        assert_eq!(chain.name(), "fallback(bad)");
    }
}
