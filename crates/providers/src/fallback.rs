//! Ordered failover between a primary model and its backups.
//!
//! Each entry may pin its own model name, so a backup on another vendor can
//! be tried with the same request. This is failover to a different model,
//! never a retry of the one that failed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use wordtutor_core::error::ProviderError;
use wordtutor_core::provider::*;

pub struct FallbackProvider {
    name: String,
    chain: Vec<FallbackEntry>,
}

struct FallbackEntry {
    provider: Arc<dyn Provider>,
    /// Replaces `request.model` when set
    model: Option<String>,
    timeout: Duration,
}

impl FallbackProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Append a provider that serves the request's own model.
    pub fn add(mut self, provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { provider, model: None, timeout });
        self
    }

    /// Append a provider that serves `model` instead of the requested one.
    pub fn add_model(mut self, provider: Arc<dyn Provider>, model: impl Into<String>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry {
            provider,
            model: Some(model.into()),
            timeout,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Try each entry in order until one succeeds or the chain is exhausted.
    async fn attempt<T, F, Fut>(&self, request: ProviderRequest, mode: &str, call: F) -> Result<T, ProviderError>
    where
        F: Fn(Arc<dyn Provider>, ProviderRequest) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut last_error = ProviderError::NotConfigured("No providers in fallback chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let mut request = request.clone();
            if let Some(model) = &entry.model {
                request.model = model.clone();
            }
            let provider_name = entry.provider.name().to_string();

            info!(
                provider = %provider_name,
                model = %request.model,
                attempt = i + 1,
                total = self.chain.len(),
                mode,
                "Fallback: trying provider"
            );

            match tokio::time::timeout(entry.timeout, call(entry.provider.clone(), request)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    warn!(provider = %provider_name, error = %e, "Fallback: provider failed");
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        provider = %provider_name,
                        timeout_secs = entry.timeout.as_secs(),
                        "Fallback: provider timed out"
                    );
                    last_error = ProviderError::Timeout(format!(
                        "Provider '{}' timed out after {}s",
                        provider_name,
                        entry.timeout.as_secs()
                    ));
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.attempt(request, "complete", |p, r| async move { p.complete(r).await })
            .await
    }

    /// Failover happens only while opening the stream. Once chunks are
    /// flowing, an interruption is reported to the caller as-is.
    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        self.attempt(request, "stream", |p, r| async move { p.stream(r).await })
            .await
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        match self.chain.first() {
            Some(entry) => entry.provider.embed(request).await,
            None => Err(ProviderError::NotConfigured("No providers in fallback chain".into())),
        }
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        for entry in &self.chain {
            if let Ok(true) = entry.provider.health_check().await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wordtutor_core::message::Message;

    const LONG: Duration = Duration::from_secs(30);

    /// Records the model of every request; fails with `error` when set.
    struct RecordingProvider {
        name: String,
        error: Option<ProviderError>,
        models: Mutex<Vec<String>>,
    }

    impl RecordingProvider {
        fn ok(name: &str) -> Arc<Self> {
            Arc::new(Self { name: name.into(), error: None, models: Mutex::new(vec![]) })
        }

        fn failing(name: &str, error: ProviderError) -> Arc<Self> {
            Arc::new(Self { name: name.into(), error: Some(error), models: Mutex::new(vec![]) })
        }

        fn models(&self) -> Vec<String> {
            self.models.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.models.lock().unwrap().push(request.model.clone());
            match &self.error {
                Some(e) => Err(e.clone()),
                None => Ok(ProviderResponse {
                    message: Message::assistant(format!("from {}", self.name)),
                    usage: None,
                    model: request.model,
                }),
            }
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Timeout("unreachable".into()))
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "primary-model".into(),
            messages: vec![Message::user("boy")],
            temperature: 0.1,
            max_tokens: Some(512),
            tools: vec![],
            stream: false,
        }
    }

    #[tokio::test]
    async fn primary_success_skips_backup() {
        let primary = RecordingProvider::ok("primary");
        let backup = RecordingProvider::ok("backup");
        let chain = FallbackProvider::new("chain")
            .add(primary.clone(), LONG)
            .add_model(backup.clone(), "deepseek-chat", LONG);

        let response = chain.complete(request()).await.unwrap();
        assert_eq!(response.message.content, "from primary");
        assert_eq!(primary.models(), vec!["primary-model"]);
        assert!(backup.models().is_empty());
    }

    #[tokio::test]
    async fn backup_gets_its_own_model_name() {
        let primary = RecordingProvider::failing(
            "primary",
            ProviderError::ApiError { status_code: 500, message: "boom".into() },
        );
        let backup = RecordingProvider::ok("backup");
        let chain = FallbackProvider::new("chain")
            .add(primary.clone(), LONG)
            .add_model(backup.clone(), "deepseek-chat", LONG);

        let response = chain.complete(request()).await.unwrap();
        assert_eq!(response.model, "deepseek-chat");
        assert_eq!(primary.models().len(), 1);
        assert_eq!(backup.models(), vec!["deepseek-chat"]);
    }

    #[tokio::test]
    async fn all_fail_returns_last_error() {
        let chain = FallbackProvider::new("chain")
            .add(RecordingProvider::failing("a", ProviderError::Network("refused".into())), LONG)
            .add(RecordingProvider::failing("b", ProviderError::AuthenticationFailed("bad key".into())), LONG);

        match chain.complete(request()).await.unwrap_err() {
            ProviderError::AuthenticationFailed(_) => {}
            other => panic!("Expected AuthenticationFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_triggers_fallback() {
        let backup = RecordingProvider::ok("backup");
        let chain = FallbackProvider::new("chain")
            .add(Arc::new(HangingProvider), Duration::from_millis(50))
            .add(backup.clone(), LONG);

        assert!(chain.complete(request()).await.is_ok());
        assert_eq!(backup.models().len(), 1);
    }

    #[tokio::test]
    async fn stream_falls_back_when_opening_fails() {
        let chain = FallbackProvider::new("chain")
            .add(RecordingProvider::failing("a", ProviderError::Network("refused".into())), LONG)
            .add_model(RecordingProvider::ok("b"), "backup-model", LONG);

        let mut rx = chain.stream(request()).await.unwrap();
        let chunk = rx.recv().await.unwrap().unwrap();
        assert_eq!(chunk.content.as_deref(), Some("from b"));
    }

    #[tokio::test]
    async fn empty_chain_returns_not_configured() {
        let chain = FallbackProvider::new("empty");
        assert!(chain.is_empty());
        assert!(matches!(
            chain.complete(request()).await.unwrap_err(),
            ProviderError::NotConfigured(_)
        ));
    }
}
