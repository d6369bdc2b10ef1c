use std::collections::BTreeMap;
use std::sync::Arc;

use super::announce;
use crate::db::{load_json, save_json, Storage, MODEL_CONFIGS_KEY};
use crate::error::{AppResult, ValidationError};
use crate::llm::{default_model_configs, ModelConfig, ModelInfo, ProviderKind};
use crate::notify::Notifier;

/// Per-provider connection settings. Edits stay in memory until `save`.
pub struct ProviderSettings {
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    configs: BTreeMap<String, ModelConfig>,
}

/// Masks API keys longer than 8 characters for display: `sk-1...wxyz`.
pub fn mask_key(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        value.to_string()
    }
}

impl ProviderSettings {
    pub fn load(storage: Arc<dyn Storage>, notifier: Arc<dyn Notifier>) -> Self {
        let mut configs = default_model_configs();
        if let Some(saved) =
            load_json::<BTreeMap<String, ModelConfig>>(storage.as_ref(), MODEL_CONFIGS_KEY)
        {
            configs.extend(saved);
        }
        Self {
            storage,
            notifier,
            configs,
        }
    }

    pub fn configs(&self) -> &BTreeMap<String, ModelConfig> {
        &self.configs
    }

    pub fn get(&self, provider: &str) -> Option<&ModelConfig> {
        self.configs.get(provider)
    }

    /// Applies `edit` to the named provider's config.
    pub fn update(
        &mut self,
        provider: &str,
        edit: impl FnOnce(&mut ModelConfig),
    ) -> Result<&ModelConfig, ValidationError> {
        let config = self
            .configs
            .get_mut(provider)
            .ok_or_else(|| ValidationError::UnknownProvider(provider.to_string()))?;
        edit(&mut *config);
        Ok(&*config)
    }

    pub fn save(&self) -> AppResult<()> {
        let flushed = save_json(self.storage.as_ref(), MODEL_CONFIGS_KEY, &self.configs);
        announce(
            self.notifier.as_ref(),
            flushed,
            "Configurations saved",
            "Model configurations have been saved.",
        )
    }

    /// Copy of the configs with API keys masked.
    pub fn masked(&self) -> BTreeMap<String, ModelConfig> {
        self.configs
            .iter()
            .map(|(k, c)| {
                let mut c = c.clone();
                c.api_key = mask_key(&c.api_key);
                (k.clone(), c)
            })
            .collect()
    }

    /// Models that can be chatted with right now.
    pub fn available_models(&self) -> Vec<ModelInfo> {
        self.configs
            .values()
            .filter(|c| c.is_ready() || (c.provider == ProviderKind::Local && c.is_enabled))
            .map(|c| ModelInfo {
                id: format!("{}/{}", c.provider.key(), c.model),
                name: c.model.clone(),
                provider: c.provider.display_name().to_string(),
            })
            .collect()
    }
}
