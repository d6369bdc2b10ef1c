use serde::Serialize;

use crate::db::models::{ConversationEntry, EntryDraft};
use crate::filter::{self, EntryFilter, Selection};
use crate::AppState;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TagIndex {
    pub tags: Vec<String>,
    pub intents: Vec<String>,
    pub outcomes: Vec<String>,
}

/// The entries passing the active filter.
pub fn list_entries(state: &AppState) -> Vec<ConversationEntry> {
    state
        .filter
        .apply(state.entries.entries())
        .into_iter()
        .cloned()
        .collect()
}

pub fn get_entry(state: &AppState, id: &str) -> Result<ConversationEntry, String> {
    state
        .entries
        .get(id)
        .cloned()
        .ok_or_else(|| format!("Entry not found: {id}"))
}

pub fn new_entry_draft() -> EntryDraft {
    EntryDraft::template()
}

pub fn save_entry(state: &mut AppState, draft: EntryDraft) -> Result<ConversationEntry, String> {
    state.entries.create(draft).map_err(|e| e.to_string())
}

pub fn delete_entry(state: &mut AppState, id: &str) -> Result<bool, String> {
    let removed = state.entries.delete(id).map_err(|e| e.to_string())?;
    if removed && state.selection.contains(id) {
        state.selection.toggle(id);
    }
    Ok(removed)
}

/// New favorite flag, or `None` when no entry has that id.
pub fn toggle_favorite(state: &mut AppState, id: &str) -> Result<Option<bool>, String> {
    state.entries.toggle_favorite(id).map_err(|e| e.to_string())
}

/// Imports a JSON array of entries.
pub fn import_entries(state: &mut AppState, json: &str) -> Result<usize, String> {
    let entries: Vec<ConversationEntry> =
        serde_json::from_str(json).map_err(|e| format!("Invalid import file: {e}"))?;
    state.entries.import(entries).map_err(|e| e.to_string())
}

pub fn set_filter(state: &mut AppState, filter: EntryFilter) -> usize {
    state.filter = filter;
    state.filter.apply(state.entries.entries()).len()
}

pub fn get_tag_index(state: &AppState) -> TagIndex {
    let entries = state.entries.entries();
    TagIndex {
        tags: filter::distinct_tags(entries).into_iter().collect(),
        intents: filter::distinct_intents(entries).into_iter().collect(),
        outcomes: filter::distinct_outcomes(entries).into_iter().collect(),
    }
}

pub fn toggle_selection(state: &mut AppState, id: &str) -> bool {
    state.selection.toggle(id)
}

/// Selects every entry passing the active filter.
pub fn select_all_filtered(state: &mut AppState) -> usize {
    let view = state.filter.apply(state.entries.entries());
    state.selection.select_all(&view);
    state.selection.len()
}

/// Replaces the selection with exactly these ids; repeats count once.
pub fn select_ids(state: &mut AppState, ids: Vec<String>) -> usize {
    state.selection = Selection::of(ids);
    state.selection.len()
}

pub fn clear_selection(state: &mut AppState) {
    state.selection.clear();
}
