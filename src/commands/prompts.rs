use serde::Deserialize;

use crate::db::models::{FewShotExample, PromptParameters, PromptVersion};
use crate::AppState;

/// Partial edit of the prompt draft. Absent fields are left alone.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PromptEdit {
    pub system_prompt: Option<String>,
    pub notes: Option<String>,
    pub parameters: Option<PromptParameters>,
}

pub fn get_current_prompt(state: &AppState) -> PromptVersion {
    state.prompts.current().clone()
}

pub fn list_prompt_versions(state: &AppState) -> Vec<PromptVersion> {
    state.prompts.versions().to_vec()
}

pub fn edit_prompt(state: &mut AppState, edit: PromptEdit) -> Result<PromptVersion, String> {
    if let Some(parameters) = edit.parameters {
        state
            .prompts
            .set_parameters(parameters)
            .map_err(|e| e.to_string())?;
    }
    if let Some(prompt) = edit.system_prompt {
        state.prompts.set_system_prompt(prompt);
    }
    if let Some(notes) = edit.notes {
        state.prompts.set_notes(notes);
    }
    Ok(state.prompts.current().clone())
}

pub fn save_prompt_version(state: &mut AppState) -> Result<PromptVersion, String> {
    state
        .prompts
        .save_version()
        .cloned()
        .map_err(|e| e.to_string())
}

pub fn load_prompt_version(state: &mut AppState, id: &str) -> Result<PromptVersion, String> {
    state
        .prompts
        .load_version(id)
        .cloned()
        .map_err(|e| e.to_string())
}

pub fn reset_prompt(state: &mut AppState) -> PromptVersion {
    state.prompts.reset_to_default();
    state.prompts.current().clone()
}

pub fn add_few_shot_example(
    state: &mut AppState,
    input: &str,
    output: &str,
    description: &str,
) -> Result<FewShotExample, String> {
    state
        .prompts
        .add_few_shot_example(input, output, description)
        .cloned()
        .map_err(|e| e.to_string())
}

pub fn remove_few_shot_example(state: &mut AppState, id: &str) -> bool {
    state.prompts.remove_few_shot_example(id)
}

pub fn few_shot_preview(state: &AppState) -> String {
    state.prompts.render_few_shot_preview()
}
