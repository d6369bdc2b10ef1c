use serde::Serialize;

use crate::db::models::{SessionMetadata, SimulationSession};
use crate::llm::{LatencyProfile, MockProvider, ProviderKind, Reply};
use crate::notify::{Notification, Notifier};
use crate::store::Simulator;
use crate::AppState;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SentMessage {
    pub session: SimulationSession,
    /// Pre-filled assistant reply offered in manual mode.
    pub suggestion: Option<&'static str>,
}

pub fn list_sessions(state: &AppState) -> Vec<SimulationSession> {
    state.sessions.sessions().to_vec()
}

pub fn current_session(state: &AppState) -> SimulationSession {
    state.simulator.session().clone()
}

pub fn open_session(state: &mut AppState, id: &str) -> Result<SimulationSession, String> {
    let session = state
        .sessions
        .get(id)
        .cloned()
        .ok_or_else(|| format!("Session not found: {id}"))?;
    state.simulator = Simulator::resume(session);
    Ok(current_session(state))
}

pub fn configure_session(
    state: &mut AppState,
    title: Option<String>,
    scenario: Option<String>,
    metadata: Option<SessionMetadata>,
) -> SimulationSession {
    if let Some(title) = title {
        state.simulator.set_title(title);
    }
    if let Some(scenario) = scenario {
        state.simulator.set_scenario(scenario);
    }
    if let Some(metadata) = metadata {
        state.simulator.set_metadata(metadata);
    }
    current_session(state)
}

pub fn set_manual_mode(state: &mut AppState, manual: bool) {
    state.simulator.set_manual(manual);
}

pub fn send_user_message(state: &mut AppState, content: &str) -> SentMessage {
    let suggestion = state.simulator.send_user_message(content);
    SentMessage {
        session: current_session(state),
        suggestion,
    }
}

pub fn send_assistant_message(state: &mut AppState, content: &str) -> SimulationSession {
    state.simulator.send_assistant_message(content);
    current_session(state)
}

/// AI mode: the first ready provider answers the last user turn.
pub async fn auto_reply(state: &mut AppState, latency: LatencyProfile) -> Result<Reply, String> {
    let Some(config) = state
        .providers
        .configs()
        .values()
        .find(|c| c.is_ready())
        .cloned()
    else {
        state.notifier.notify(Notification::failure(
            "Model not configured",
            "Configure a model provider before using AI mode.",
        ));
        return Err("No model provider is configured".to_string());
    };
    let provider = MockProvider::new(config.provider, &config.model).with_latency(latency);
    state.simulator.auto_reply(&provider).await.map_err(|e| {
        state
            .notifier
            .notify(Notification::failure("Reply failed", e.to_string()));
        e.to_string()
    })
}

pub fn tag_message(state: &mut AppState, message_id: &str, tag: &str) -> bool {
    state.simulator.add_tag_to_message(message_id, tag)
}

pub fn untag_message(state: &mut AppState, message_id: &str, tag: &str) {
    state.simulator.remove_tag_from_message(message_id, tag);
}

pub fn save_session(state: &mut AppState) -> Result<(), String> {
    let AppState {
        simulator, sessions, ..
    } = state;
    simulator.save(sessions).map_err(|e| e.to_string())
}

pub fn reset_session(state: &mut AppState) -> SimulationSession {
    state.simulator.reset();
    current_session(state)
}

/// Provider used by AI mode when none is picked explicitly.
pub fn default_provider_kind(state: &AppState) -> Option<ProviderKind> {
    state
        .providers
        .configs()
        .values()
        .find(|c| c.is_ready())
        .map(|c| c.provider)
}
