//! Build providers from [`AppConfig`].

use std::sync::Arc;
use std::time::Duration;

use wordtutor_config::{AppConfig, ConfigError};
use wordtutor_core::error::ProviderError;
use wordtutor_core::Provider;

use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// The chat model a tutor talks to.
#[derive(Clone)]
pub struct ChatModel {
    pub provider: Arc<dyn Provider>,
    /// Model name sent with every request
    pub model: String,
}

/// Build the chat provider. Fails on a missing `BASE_URL`, `MODEL_API_KEY`,
/// or `MODEL_NAME`. A configured backup model wraps both in a
/// [`FallbackProvider`].
pub fn build_from_config(config: &AppConfig) -> Result<ChatModel, BuildError> {
    let endpoint = config.require_model()?;
    let timeout = Duration::from_secs(config.model.timeout_secs);

    let primary: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::with_timeout(
        "primary",
        &endpoint.base_url,
        &endpoint.api_key,
        timeout,
    )?);

    let Some(backup) = &config.model.backup else {
        return Ok(ChatModel { provider: primary, model: endpoint.name });
    };

    let backup_provider = Arc::new(OpenAiCompatProvider::with_timeout(
        "backup",
        backup.base_url.as_deref().unwrap_or(&endpoint.base_url),
        backup.api_key.as_deref().unwrap_or(&endpoint.api_key),
        timeout,
    )?);

    tracing::info!(primary = %endpoint.name, backup = %backup.name, "Backup model configured");

    let chain = FallbackProvider::new("fallback")
        .add(primary, timeout)
        .add_model(backup_provider, backup.name.clone(), timeout);

    Ok(ChatModel {
        provider: Arc::new(chain),
        model: endpoint.name,
    })
}

/// Build the embedding provider, or `None` when retrieval is disabled.
/// Unset embedding endpoint fields fall back to the chat endpoint.
pub fn build_embedder(config: &AppConfig) -> Result<Option<Arc<dyn Provider>>, BuildError> {
    if !config.retrieval.enabled {
        return Ok(None);
    }
    let retrieval = &config.retrieval;

    let base_url = retrieval
        .embedding_base_url
        .clone()
        .or_else(|| config.model.base_url.clone())
        .ok_or(ConfigError::MissingVariable("EMBEDDING_API_BASE"))?;
    let api_key = retrieval
        .embedding_api_key
        .clone()
        .or_else(|| config.model.api_key.clone())
        .ok_or(ConfigError::MissingVariable("EMBEDDING_API_KEY"))?;

    let provider = OpenAiCompatProvider::with_timeout(
        "embeddings",
        base_url,
        api_key,
        Duration::from_secs(config.model.timeout_secs),
    )?;
    Ok(Some(Arc::new(provider)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.model.base_url = Some("https://llm.example/v1".into());
        config.model.api_key = Some("sk-test".into());
        config.model.name = Some("qwen-plus".into());
        config
    }

    #[test]
    fn missing_variable_is_reported() {
        let err = build_from_config(&AppConfig::default()).err().unwrap();
        assert!(err.to_string().contains("BASE_URL"));
    }

    #[test]
    fn primary_only() {
        let chat = build_from_config(&configured()).unwrap();
        assert_eq!(chat.provider.name(), "primary");
        assert_eq!(chat.model, "qwen-plus");
    }

    #[test]
    fn backup_wraps_in_fallback() {
        let mut config = configured();
        config.model.backup = Some(wordtutor_config::BackupModelConfig {
            name: "deepseek-chat".into(),
            base_url: None,
            api_key: None,
        });
        let chat = build_from_config(&config).unwrap();
        assert_eq!(chat.provider.name(), "fallback");
        assert_eq!(chat.model, "qwen-plus");
    }

    #[test]
    fn embedder_disabled_by_default() {
        assert!(build_embedder(&configured()).unwrap().is_none());
    }

    #[test]
    fn embedder_inherits_chat_endpoint() {
        let mut config = configured();
        config.retrieval.enabled = true;
        let embedder = build_embedder(&config).unwrap().unwrap();
        assert_eq!(embedder.name(), "embeddings");
    }
}
