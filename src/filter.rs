//! Tag index and multi-criteria filtering over conversation entries.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::db::models::ConversationEntry;

/// Criteria for narrowing the entry list. Empty fields and the value
/// `"all"` impose no constraint; the active ones are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryFilter {
    /// Case-insensitive substring of the title or the intent.
    pub search: String,
    /// Matches entries carrying any of these tags.
    pub tags: BTreeSet<String>,
    pub intent: Option<String>,
    pub outcome: Option<String>,
    pub complexity: Option<String>,
}

fn is_wildcard(value: &Option<String>) -> bool {
    match value.as_deref() {
        None => true,
        Some(v) => v.is_empty() || v == "all",
    }
}

fn exact(value: &Option<String>, actual: &str) -> bool {
    is_wildcard(value) || value.as_deref() == Some(actual)
}

impl EntryFilter {
    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
            && self.tags.is_empty()
            && is_wildcard(&self.intent)
            && is_wildcard(&self.outcome)
            && is_wildcard(&self.complexity)
    }

    pub fn matches(&self, entry: &ConversationEntry) -> bool {
        let meta = &entry.metadata;
        let search = self.search.to_lowercase();
        let search_ok = search.is_empty()
            || entry.title.to_lowercase().contains(&search)
            || meta.intent.to_lowercase().contains(&search);
        let tags_ok = self.tags.is_empty() || meta.tags.iter().any(|t| self.tags.contains(t));

        search_ok
            && tags_ok
            && exact(&self.intent, &meta.intent)
            && exact(&self.outcome, &meta.outcome)
            && exact(&self.complexity, meta.complexity.as_str())
    }

    /// The matching entries, in collection order.
    pub fn apply<'a>(&self, entries: &'a [ConversationEntry]) -> Vec<&'a ConversationEntry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }
}

pub fn distinct_tags(entries: &[ConversationEntry]) -> BTreeSet<String> {
    entries
        .iter()
        .flat_map(|e| e.metadata.tags.iter().cloned())
        .collect()
}

pub fn distinct_intents(entries: &[ConversationEntry]) -> BTreeSet<String> {
    entries.iter().map(|e| e.metadata.intent.clone()).collect()
}

pub fn distinct_outcomes(entries: &[ConversationEntry]) -> BTreeSet<String> {
    entries.iter().map(|e| e.metadata.outcome.clone()).collect()
}

/// Splits a comma-separated tag field into trimmed, non-blank, unique tags.
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Ids the user has ticked for export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: HashSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
            return true;
        }
        false
    }

    /// Replaces the selection with exactly the given entries.
    pub fn select_all(&mut self, view: &[&ConversationEntry]) {
        self.ids = view.iter().map(|e| e.id.clone()).collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// Entries that pass `filter` and are selected, in collection order.
pub fn selected_view<'a>(
    entries: &'a [ConversationEntry],
    filter: &EntryFilter,
    selection: &Selection,
) -> Vec<&'a ConversationEntry> {
    entries
        .iter()
        .filter(|e| selection.contains(&e.id) && filter.matches(e))
        .collect()
}
