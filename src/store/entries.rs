use std::sync::Arc;

use super::announce;
use crate::db::models::{new_id, now_iso, ConversationEntry, EntryDraft};
use crate::db::{load_json, save_json, Storage, StorageError, ENTRIES_KEY};
use crate::error::AppResult;
use crate::notify::Notifier;

/// The conversation entries, written through to storage after every change.
pub struct EntryStore {
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    entries: Vec<ConversationEntry>,
}

impl EntryStore {
    pub fn load(storage: Arc<dyn Storage>, notifier: Arc<dyn Notifier>) -> Self {
        let entries: Vec<ConversationEntry> =
            load_json(storage.as_ref(), ENTRIES_KEY).unwrap_or_default();
        tracing::debug!(count = entries.len(), "loaded conversation entries");
        Self {
            storage,
            notifier,
            entries,
        }
    }

    /// Re-reads the collection from storage, dropping unsaved state.
    pub fn load_all(&mut self) {
        self.entries = load_json(self.storage.as_ref(), ENTRIES_KEY).unwrap_or_default();
    }

    pub fn persist_all(&self) -> Result<(), StorageError> {
        save_json(self.storage.as_ref(), ENTRIES_KEY, &self.entries)
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ConversationEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Stores a draft. Drafts without an id get a fresh one; a draft whose
    /// id is already stored replaces that entry in place.
    pub fn create(&mut self, draft: EntryDraft) -> AppResult<ConversationEntry> {
        let id = draft.id.unwrap_or_else(new_id);
        let created_at = self
            .get(&id)
            .map(|e| e.created_at.clone())
            .unwrap_or_else(now_iso);
        let entry = ConversationEntry {
            id,
            title: draft.title,
            messages: draft.messages,
            metadata: draft.metadata,
            created_at,
            is_favorite: draft.is_favorite,
        };
        self.upsert(entry)
    }

    pub fn upsert(&mut self, entry: ConversationEntry) -> AppResult<ConversationEntry> {
        match self.position(&entry.id) {
            Some(idx) => self.entries[idx] = entry.clone(),
            None => self.entries.push(entry.clone()),
        }
        tracing::info!(id = %entry.id, "entry saved");
        announce(
            self.notifier.as_ref(),
            self.persist_all(),
            "Entry saved",
            "Conversation entry has been saved successfully.",
        )?;
        Ok(entry)
    }

    /// Upserts every entry and flushes once.
    pub fn import(&mut self, entries: Vec<ConversationEntry>) -> AppResult<usize> {
        let count = entries.len();
        for entry in entries {
            match self.position(&entry.id) {
                Some(idx) => self.entries[idx] = entry,
                None => self.entries.push(entry),
            }
        }
        tracing::info!(count, "entries imported");
        announce(
            self.notifier.as_ref(),
            self.persist_all(),
            "Import complete",
            format!("Imported {count} conversations."),
        )?;
        Ok(count)
    }

    /// Returns whether an entry was removed. Unknown ids are a no-op.
    pub fn delete(&mut self, id: &str) -> AppResult<bool> {
        let Some(idx) = self.position(id) else {
            return Ok(false);
        };
        self.entries.remove(idx);
        tracing::info!(id, "entry deleted");
        announce(
            self.notifier.as_ref(),
            self.persist_all(),
            "Entry deleted",
            "Conversation entry has been removed.",
        )?;
        Ok(true)
    }

    /// Returns the new favorite flag, or `None` for an unknown id.
    pub fn toggle_favorite(&mut self, id: &str) -> AppResult<Option<bool>> {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        entry.is_favorite = !entry.is_favorite;
        let now = entry.is_favorite;
        let title = if now { "Added to favorites" } else { "Removed from favorites" };
        announce(self.notifier.as_ref(), self.persist_all(), title, entry_label(id))?;
        Ok(Some(now))
    }
}

fn entry_label(id: &str) -> String {
    format!("Entry {id}")
}
