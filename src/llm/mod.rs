pub mod mock;

pub use mock::{LatencyProfile, MockProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::error::ValidationError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    OpenRouter,
    HuggingFace,
    Local,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::OpenRouter,
        ProviderKind::HuggingFace,
        ProviderKind::Local,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::HuggingFace => "huggingface",
            ProviderKind::Local => "local",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::OpenRouter => "OpenRouter",
            ProviderKind::HuggingFace => "Hugging Face",
            ProviderKind::Local => "Local",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

/// Connection settings for one provider, stored under the provider key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub provider: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub is_enabled: bool,
}

impl ModelConfig {
    pub fn default_for(provider: ProviderKind) -> Self {
        let (model, base_url) = match provider {
            ProviderKind::OpenAi => ("gpt-4", None),
            ProviderKind::OpenRouter => (
                "anthropic/claude-3-sonnet",
                Some("https://openrouter.ai/api/v1"),
            ),
            ProviderKind::HuggingFace => ("microsoft/DialoGPT-medium", None),
            ProviderKind::Local => ("llama-7b", Some("http://localhost:8080")),
        };
        Self {
            provider,
            api_key: String::new(),
            model: model.into(),
            base_url: base_url.map(Into::into),
            is_enabled: false,
        }
    }

    /// Enabled and holding an API key.
    pub fn is_ready(&self) -> bool {
        self.is_enabled && !self.api_key.is_empty()
    }
}

pub fn default_model_configs() -> BTreeMap<String, ModelConfig> {
    ProviderKind::ALL
        .into_iter()
        .map(|k| (k.key().to_string(), ModelConfig::default_for(k)))
        .collect()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    pub model: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Connection failed: {0}")]
    Connection(String),
}

impl Serialize for ProviderError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Anything that can answer a negotiation turn.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;
    async fn respond(&self, message: &str) -> Result<Reply, ProviderError>;
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TestResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
}

/// Sends `message` through `provider` and reports the outcome. Disabled or
/// key-less configs are rejected before any call is made.
pub async fn test_provider(
    config: &ModelConfig,
    provider: &dyn ModelProvider,
    message: &str,
) -> Result<TestResult, ValidationError> {
    if !config.is_ready() {
        return Err(ValidationError::ProviderNotConfigured(
            config.provider.key().to_string(),
        ));
    }
    let responder = provider.kind().key();
    let started = Instant::now();
    let result = match provider.respond(message).await {
        Ok(reply) => {
            let latency = started.elapsed().as_millis() as u64;
            tracing::info!(provider = config.provider.key(), responder, latency, "provider test succeeded");
            TestResult {
                success: true,
                response: Some(reply.content),
                error: None,
                latency: Some(latency),
            }
        }
        Err(e) => {
            tracing::warn!(provider = config.provider.key(), responder, error = %e, "provider test failed");
            TestResult {
                success: false,
                response: None,
                error: Some("Connection failed".into()),
                latency: None,
            }
        }
    };
    Ok(result)
}

/// Tests every ready provider one after another, pausing between calls.
pub async fn test_all<F>(
    configs: &BTreeMap<String, ModelConfig>,
    factory: F,
    message: &str,
    pause: Duration,
) -> BTreeMap<String, TestResult>
where
    F: Fn(&ModelConfig) -> Box<dyn ModelProvider>,
{
    let mut results = BTreeMap::new();
    for (key, config) in configs.iter().filter(|(_, c)| c.is_ready()) {
        let provider = factory(config);
        match test_provider(config, provider.as_ref(), message).await {
            Ok(result) => {
                results.insert(key.clone(), result);
            }
            Err(e) => tracing::debug!(provider = %key, error = %e, "skipped"),
        }
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(kind: ProviderKind) -> ModelConfig {
        ModelConfig {
            api_key: "sk-test".into(),
            is_enabled: true,
            ..ModelConfig::default_for(kind)
        }
    }

    fn instant(config: &ModelConfig) -> Box<dyn ModelProvider> {
        Box::new(
            MockProvider::new(config.provider, &config.model).with_latency(LatencyProfile::instant()),
        )
    }

    #[test]
    fn config_json_uses_camel_case_keys() {
        let json = serde_json::to_value(ModelConfig::default_for(ProviderKind::Local)).unwrap();
        assert_eq!(json["provider"], "local");
        assert_eq!(json["baseUrl"], "http://localhost:8080");
        assert_eq!(json["isEnabled"], false);
        assert_eq!(
            serde_json::to_value(ProviderKind::OpenAi).unwrap(),
            "openai"
        );
        assert_eq!(ProviderKind::from_key("huggingface"), Some(ProviderKind::HuggingFace));
    }

    #[tokio::test]
    async fn unconfigured_provider_is_rejected() {
        let config = ModelConfig::default_for(ProviderKind::OpenAi);
        let provider = instant(&config);
        let err = test_provider(&config, provider.as_ref(), "hi").await.unwrap_err();
        assert_eq!(err, ValidationError::ProviderNotConfigured("openai".into()));
    }

    #[tokio::test]
    async fn successful_test_reports_latency() {
        let config = ready(ProviderKind::OpenRouter);
        let provider = instant(&config);
        assert_eq!(provider.kind(), ProviderKind::OpenRouter);
        let result = test_provider(&config, provider.as_ref(), "hi").await.unwrap();
        assert!(result.success);
        assert!(result.latency.is_some());
        assert!(result.response.unwrap().contains("budget"));
    }

    #[tokio::test]
    async fn failures_become_connection_failed() {
        let config = ready(ProviderKind::Local);
        let provider = MockProvider::new(ProviderKind::Local, "llama-7b")
            .with_latency(LatencyProfile::instant())
            .with_failure_rate(1.0);
        let result = test_provider(&config, &provider, "hi").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Connection failed"));
    }

    #[tokio::test]
    async fn test_all_only_runs_ready_providers() {
        let mut configs = default_model_configs();
        configs.insert("openai".into(), ready(ProviderKind::OpenAi));
        let mut no_key = ready(ProviderKind::Local);
        no_key.api_key.clear();
        configs.insert("local".into(), no_key);

        let results = test_all(&configs, instant, "hi", Duration::ZERO).await;
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["openai"]);
    }
}
