use std::sync::Arc;

use super::announce;
use crate::db::models::{new_id, now_iso, FewShotExample, PromptParameters, PromptVersion};
use crate::db::{load_json, save_json, Storage, PROMPT_VERSIONS_KEY};
use crate::error::{AppError, AppResult, ValidationError};
use crate::notify::{Notification, Notifier};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are DealMind, an expert AI negotiation assistant. Your role is to help businesses close deals while maintaining customer satisfaction.

Guidelines:
- Always be professional and courteous
- Find win-win solutions when possible
- Understand the customer's needs and constraints
- Know when to hold firm and when to compromise
- Build rapport and trust throughout the conversation

Your goal is to maximize value for both parties while securing a successful transaction.";

pub fn default_prompt() -> PromptVersion {
    PromptVersion {
        id: new_id(),
        version: "1.0".into(),
        system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        few_shot_examples: Vec::new(),
        parameters: PromptParameters::default(),
        created_at: now_iso(),
        notes: String::new(),
    }
}

/// Largest label still counted in exact tenths.
const MAX_VERSION: f64 = 1e15;

/// Label of the version saved after `current`: one tenth higher, one
/// decimal place. Labels that do not parse, or fall outside
/// `0..MAX_VERSION`, count as `1.0`.
pub fn next_version(current: &str) -> String {
    let parsed = match current.trim().parse::<f64>() {
        Ok(v) if (0.0..MAX_VERSION).contains(&v) => v,
        _ => {
            tracing::warn!(version = current, "unparseable prompt version, restarting from 1.0");
            1.0
        }
    };
    // Work in whole tenths; the epsilon absorbs binary noise such as 2.3 * 10 = 22.999...
    let tenths = (parsed * 10.0 + 1e-6).floor() as u64 + 1;
    format!("{}.{}", tenths / 10, tenths % 10)
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value < min || value > max {
        return Err(ValidationError::ParameterOutOfRange {
            name,
            min,
            max,
            value,
        });
    }
    Ok(())
}

pub fn validate_parameters(p: &PromptParameters) -> Result<(), ValidationError> {
    check_range("temperature", p.temperature, 0.0, 2.0)?;
    check_range("top_p", p.top_p, 0.0, 1.0)?;
    check_range("max_tokens", f64::from(p.max_tokens), 100.0, 4000.0)
}

/// Append-only prompt history plus the draft being edited.
pub struct PromptStore {
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    versions: Vec<PromptVersion>,
    current: PromptVersion,
}

impl PromptStore {
    pub fn load(storage: Arc<dyn Storage>, notifier: Arc<dyn Notifier>) -> Self {
        let versions: Vec<PromptVersion> =
            load_json(storage.as_ref(), PROMPT_VERSIONS_KEY).unwrap_or_default();
        let current = versions.last().cloned().unwrap_or_else(default_prompt);
        tracing::debug!(versions = versions.len(), current = %current.version, "loaded prompt history");
        Self {
            storage,
            notifier,
            versions,
            current,
        }
    }

    pub fn current(&self) -> &PromptVersion {
        &self.current
    }

    pub fn versions(&self) -> &[PromptVersion] {
        &self.versions
    }

    /// Snapshots the draft as the next version and makes it current.
    pub fn save_version(&mut self) -> AppResult<&PromptVersion> {
        let snapshot = PromptVersion {
            id: new_id(),
            version: next_version(&self.current.version),
            created_at: now_iso(),
            ..self.current.clone()
        };
        self.versions.push(snapshot.clone());
        let label = snapshot.version.clone();
        self.current = snapshot;
        tracing::info!(version = %label, "prompt version saved");

        let flushed = save_json(self.storage.as_ref(), PROMPT_VERSIONS_KEY, &self.versions);
        announce(
            self.notifier.as_ref(),
            flushed,
            "Version saved",
            format!("Prompt version {label} has been saved."),
        )?;
        Ok(&self.current)
    }

    /// Makes a copy of a saved version the draft. History is untouched.
    pub fn load_version(&mut self, id: &str) -> AppResult<&PromptVersion> {
        let found = self
            .versions
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("prompt version {id}")))?;
        self.notifier.notify(Notification::success(
            "Version loaded",
            format!("Loaded prompt version {}", found.version),
        ));
        self.current = found;
        Ok(&self.current)
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.current.system_prompt = prompt.into();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.current.notes = notes.into();
    }

    pub fn set_parameters(&mut self, parameters: PromptParameters) -> Result<(), ValidationError> {
        validate_parameters(&parameters)?;
        self.current.parameters = parameters;
        Ok(())
    }

    pub fn add_few_shot_example(
        &mut self,
        input: &str,
        output: &str,
        description: &str,
    ) -> Result<&FewShotExample, ValidationError> {
        if input.trim().is_empty() || output.trim().is_empty() {
            self.notifier.notify(Notification::failure(
                "Incomplete example",
                ValidationError::IncompleteExample.to_string(),
            ));
            return Err(ValidationError::IncompleteExample);
        }
        let idx = self.current.few_shot_examples.len();
        self.current.few_shot_examples.push(FewShotExample {
            id: new_id(),
            input: input.to_string(),
            output: output.to_string(),
            description: description.to_string(),
        });
        self.notifier.notify(Notification::success(
            "Example added",
            "Few-shot example has been added successfully.",
        ));
        Ok(&self.current.few_shot_examples[idx])
    }

    pub fn remove_few_shot_example(&mut self, id: &str) -> bool {
        let before = self.current.few_shot_examples.len();
        self.current.few_shot_examples.retain(|ex| ex.id != id);
        before != self.current.few_shot_examples.len()
    }

    pub fn reset_to_default(&mut self) {
        self.current = default_prompt();
    }

    /// The draft's prompt followed by its examples, for copying elsewhere.
    pub fn render_few_shot_preview(&self) -> String {
        let mut out = self.current.system_prompt.clone();
        for ex in &self.current.few_shot_examples {
            out.push_str("\n\n");
            if !ex.description.is_empty() {
                out.push_str(&format!("# {}\n", ex.description));
            }
            out.push_str(&format!("Input: {}\nOutput: {}", ex.input, ex.output));
        }
        out
    }
}
