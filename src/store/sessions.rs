use std::sync::Arc;

use super::announce;
use crate::db::models::{
    new_id, now_iso, Role, SessionMetadata, SimMessage, SimulationSession,
};
use crate::db::{load_json, save_json, Storage, SESSIONS_KEY};
use crate::error::AppResult;
use crate::llm::{ModelProvider, Reply};
use crate::notify::Notifier;

/// Suggested assistant turn offered after a user message in manual mode.
pub const MANUAL_REPLY_HINT: &str = "I understand. Let me see what I can do for you...";

/// Saved simulator sessions, keyed by id.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    sessions: Vec<SimulationSession>,
}

impl SessionStore {
    pub fn load(storage: Arc<dyn Storage>, notifier: Arc<dyn Notifier>) -> Self {
        let sessions = load_json(storage.as_ref(), SESSIONS_KEY).unwrap_or_default();
        Self {
            storage,
            notifier,
            sessions,
        }
    }

    pub fn sessions(&self) -> &[SimulationSession] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&SimulationSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Replaces the stored session with the same id, or appends.
    pub fn save(&mut self, session: &SimulationSession) -> AppResult<()> {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => self.sessions.push(session.clone()),
        }
        let flushed = save_json(self.storage.as_ref(), SESSIONS_KEY, &self.sessions);
        announce(
            self.notifier.as_ref(),
            flushed,
            "Session saved",
            "Your conversation simulation has been saved.",
        )
    }
}

/// The live chat being authored. Nothing here is persisted until
/// [`SessionStore::save`] is called.
pub struct Simulator {
    session: SimulationSession,
    manual: bool,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            session: SimulationSession::fresh(),
            manual: true,
        }
    }

    pub fn resume(session: SimulationSession) -> Self {
        Self {
            session,
            manual: true,
        }
    }

    pub fn session(&self) -> &SimulationSession {
        &self.session
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn set_manual(&mut self, manual: bool) {
        self.manual = manual;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.session.title = title.into();
    }

    pub fn set_scenario(&mut self, scenario: impl Into<String>) {
        self.session.scenario = scenario.into();
    }

    pub fn set_metadata(&mut self, metadata: SessionMetadata) {
        self.session.metadata = metadata;
    }

    fn push(&mut self, role: Role, content: &str) -> Option<&SimMessage> {
        if content.trim().is_empty() {
            return None;
        }
        self.session.messages.push(SimMessage {
            id: new_id(),
            role,
            content: content.to_string(),
            timestamp: now_iso(),
            tags: Vec::new(),
        });
        self.session.messages.last()
    }

    /// Appends a user turn. Blank input is ignored. In manual mode the
    /// returned hint pre-fills the assistant reply.
    pub fn send_user_message(&mut self, content: &str) -> Option<&'static str> {
        self.push(Role::User, content)?;
        self.manual.then_some(MANUAL_REPLY_HINT)
    }

    pub fn send_assistant_message(&mut self, content: &str) -> bool {
        self.push(Role::Assistant, content).is_some()
    }

    /// Asks `provider` to answer the last user turn and records the reply.
    pub async fn auto_reply(&mut self, provider: &dyn ModelProvider) -> AppResult<Reply> {
        let prompt = self
            .session
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let reply = provider.respond(&prompt).await?;
        self.push(Role::Assistant, &reply.content);
        Ok(reply)
    }

    pub fn add_tag_to_message(&mut self, message_id: &str, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        match self.session.messages.iter_mut().find(|m| m.id == message_id) {
            Some(msg) => {
                msg.tags.push(tag.to_string());
                true
            }
            None => false,
        }
    }

    pub fn remove_tag_from_message(&mut self, message_id: &str, tag: &str) {
        if let Some(msg) = self.session.messages.iter_mut().find(|m| m.id == message_id) {
            msg.tags.retain(|t| t != tag);
        }
    }

    /// Starts over with a fresh session id.
    pub fn reset(&mut self) {
        self.session = SimulationSession::fresh();
    }

    pub fn save(&self, store: &mut SessionStore) -> AppResult<()> {
        store.save(&self.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;
    use crate::llm::{LatencyProfile, MockProvider, ProviderKind};
    use crate::notify::NotificationLog;

    fn session_store() -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::load(storage.clone(), Arc::new(NotificationLog::new()));
        (store, storage)
    }

    #[test]
    fn blank_messages_are_ignored() {
        let mut sim = Simulator::new();
        assert_eq!(sim.send_user_message("   "), None);
        assert!(!sim.send_assistant_message(""));
        assert!(sim.session().messages.is_empty());
    }

    #[test]
    fn manual_mode_suggests_reply() {
        let mut sim = Simulator::new();
        assert_eq!(sim.send_user_message("Too pricey"), Some(MANUAL_REPLY_HINT));
        sim.set_manual(false);
        assert_eq!(sim.send_user_message("Still pricey"), None);
        assert_eq!(sim.session().messages.len(), 2);
    }

    #[test]
    fn tags_attach_and_detach() {
        let mut sim = Simulator::new();
        sim.send_user_message("hi");
        let id = sim.session().messages[0].id.clone();
        assert!(sim.add_tag_to_message(&id, "opening"));
        assert!(sim.add_tag_to_message(&id, "polite"));
        assert!(!sim.add_tag_to_message(&id, " "));
        assert!(!sim.add_tag_to_message("missing", "x"));
        sim.remove_tag_from_message(&id, "opening");
        assert_eq!(sim.session().messages[0].tags, vec!["polite"]);
    }

    #[test]
    fn save_upserts_by_id() {
        let (mut store, storage) = session_store();
        let mut sim = Simulator::new();
        sim.set_title("First");
        sim.save(&mut store).unwrap();
        sim.set_title("First, renamed");
        sim.save(&mut store).unwrap();

        sim.reset();
        sim.save(&mut store).unwrap();

        assert_eq!(store.sessions().len(), 2);
        assert_eq!(store.sessions()[0].title, "First, renamed");

        let reloaded = SessionStore::load(storage, Arc::new(NotificationLog::new()));
        assert_eq!(reloaded.sessions(), store.sessions());
    }

    #[test]
    fn reset_issues_new_id() {
        let mut sim = Simulator::new();
        let before = sim.session().id.clone();
        sim.send_user_message("hi");
        sim.reset();
        assert_ne!(sim.session().id, before);
        assert!(sim.session().messages.is_empty());
    }

    #[tokio::test]
    async fn auto_reply_appends_assistant_turn() {
        let provider = MockProvider::new(ProviderKind::OpenAi, "gpt-4")
            .with_latency(LatencyProfile::instant());
        let mut sim = Simulator::new();
        sim.set_manual(false);
        sim.send_user_message("Can you do better on price?");
        let reply = sim.auto_reply(&provider).await.unwrap();
        let last = sim.session().messages.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, reply.content);
    }
}
