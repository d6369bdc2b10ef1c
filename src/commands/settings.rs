use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::llm::{self, LatencyProfile, MockProvider, ModelConfig, ModelInfo, ModelProvider, TestResult};
use crate::notify::{Notification, Notifier};
use crate::AppState;

/// Default prompt sent by "Test connection".
pub const TEST_MESSAGE: &str = "Hello, I'm interested in your product but the price seems high.";

/// Pause between providers in "Test all".
pub const TEST_ALL_PAUSE: Duration = Duration::from_millis(500);

/// Partial edit of one provider's config.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelConfigEdit {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub is_enabled: Option<bool>,
}

/// Provider configs with API keys masked for display.
pub fn get_model_configs(state: &AppState) -> BTreeMap<String, ModelConfig> {
    state.providers.masked()
}

pub fn update_model_config(
    state: &mut AppState,
    provider: &str,
    edit: ModelConfigEdit,
) -> Result<ModelConfig, String> {
    state
        .providers
        .update(provider, |config| {
            if let Some(key) = edit.api_key {
                config.api_key = key;
            }
            if let Some(model) = edit.model {
                config.model = model;
            }
            if let Some(url) = edit.base_url {
                config.base_url = (!url.is_empty()).then_some(url);
            }
            if let Some(enabled) = edit.is_enabled {
                config.is_enabled = enabled;
            }
        })
        .cloned()
        .map_err(|e| e.to_string())
}

pub fn save_model_configs(state: &AppState) -> Result<(), String> {
    state.providers.save().map_err(|e| e.to_string())
}

pub fn get_available_models(state: &AppState) -> Vec<ModelInfo> {
    state.providers.available_models()
}

fn mock_for(config: &ModelConfig, latency: LatencyProfile) -> Box<dyn ModelProvider> {
    Box::new(MockProvider::new(config.provider, &config.model).with_latency(latency))
}

fn announce_test(state: &AppState, config: &ModelConfig, result: &TestResult) {
    let name = config.provider.display_name();
    let notification = match result.latency.filter(|_| result.success) {
        Some(ms) => Notification::success("Test successful", format!("{name} responded in {ms}ms")),
        None => Notification::failure("Test failed", format!("Failed to connect to {name}")),
    };
    state.notifier.notify(notification);
}

pub async fn test_model(
    state: &AppState,
    provider: &str,
    message: &str,
    latency: LatencyProfile,
) -> Result<TestResult, String> {
    let Some(config) = state.providers.get(provider) else {
        let e = format!("Unknown provider: {provider}");
        state.notifier.notify(Notification::failure("Model not configured", e.clone()));
        return Err(e);
    };
    let model = mock_for(config, latency);
    match llm::test_provider(config, model.as_ref(), message).await {
        Ok(result) => {
            announce_test(state, config, &result);
            Ok(result)
        }
        Err(e) => {
            state.notifier.notify(Notification::failure(
                "Model not configured",
                format!("Please configure {} before testing.", config.provider.display_name()),
            ));
            Err(e.to_string())
        }
    }
}

pub async fn test_all_models(
    state: &AppState,
    message: &str,
    latency: LatencyProfile,
    pause: Duration,
) -> BTreeMap<String, TestResult> {
    let results = llm::test_all(
        state.providers.configs(),
        |config| mock_for(config, latency),
        message,
        pause,
    )
    .await;
    for (key, result) in &results {
        if let Some(config) = state.providers.get(key) {
            announce_test(state, config, result);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Level, NotificationLog};
    use std::sync::Arc;

    fn enable(state: &mut AppState, provider: &str) {
        update_model_config(
            state,
            provider,
            ModelConfigEdit {
                api_key: Some("sk-abcdefghijkl".into()),
                is_enabled: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn configs_are_masked_for_display() {
        let mut state = AppState::in_memory(Arc::new(NotificationLog::new()));
        enable(&mut state, "openrouter");
        assert_eq!(get_model_configs(&state)["openrouter"].api_key, "sk-a...ijkl");
        assert_eq!(state.providers.get("openrouter").unwrap().api_key, "sk-abcdefghijkl");
        assert_eq!(get_available_models(&state).len(), 1);
    }

    #[test]
    fn blank_base_url_clears_it() {
        let mut state = AppState::in_memory(Arc::new(NotificationLog::new()));
        let cfg = update_model_config(
            &mut state,
            "local",
            ModelConfigEdit {
                base_url: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cfg.base_url, None);
        assert!(update_model_config(&mut state, "nope", ModelConfigEdit::default()).is_err());
    }

    #[tokio::test]
    async fn unconfigured_provider_cannot_be_tested() {
        let log = Arc::new(NotificationLog::new());
        let state = AppState::in_memory(log.clone());
        let err = test_model(&state, "openai", TEST_MESSAGE, LatencyProfile::instant())
            .await
            .unwrap_err();
        assert!(err.starts_with("Model not configured"));
        let toast = log.last().unwrap();
        assert_eq!(toast.level, Level::Failure);
        assert_eq!(toast.title, "Model not configured");
        assert_eq!(toast.description, "Please configure OpenAI before testing.");

        assert!(test_model(&state, "nope", TEST_MESSAGE, LatencyProfile::instant()).await.is_err());
        assert_eq!(log.drain().len(), 2);
    }

    #[tokio::test]
    async fn test_outcome_is_announced() {
        let log = Arc::new(NotificationLog::new());
        let mut state = AppState::in_memory(log.clone());
        enable(&mut state, "local");
        let result = test_model(&state, "local", TEST_MESSAGE, LatencyProfile::instant())
            .await
            .unwrap();
        assert!(result.success);
        let toast = log.last().unwrap();
        assert_eq!(toast.level, Level::Success);
        assert_eq!(toast.title, "Test successful");
        assert!(toast.description.starts_with("Local responded in "));
    }

    #[test]
    fn failed_test_is_announced_as_failure() {
        let log = Arc::new(NotificationLog::new());
        let mut state = AppState::in_memory(log.clone());
        enable(&mut state, "huggingface");
        let config = state.providers.get("huggingface").unwrap().clone();
        let failed = TestResult {
            success: false,
            response: None,
            error: Some("Connection failed".into()),
            latency: None,
        };
        announce_test(&state, &config, &failed);
        let toast = log.last().unwrap();
        assert_eq!(toast.level, Level::Failure);
        assert_eq!(toast.title, "Test failed");
        assert_eq!(toast.description, "Failed to connect to Hugging Face");
    }

    #[tokio::test]
    async fn test_all_covers_ready_providers_only() {
        let log = Arc::new(NotificationLog::new());
        let mut state = AppState::in_memory(log.clone());
        enable(&mut state, "openai");
        enable(&mut state, "huggingface");
        log.drain();
        let results = test_all_models(&state, TEST_MESSAGE, LatencyProfile::instant(), Duration::ZERO).await;
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["huggingface", "openai"]);
        assert!(results.values().all(|r| r.success));
        let toasts = log.drain();
        assert_eq!(toasts.len(), 2);
        assert!(toasts.iter().all(|t| t.title == "Test successful"));
    }
}
