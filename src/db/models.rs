use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current UTC time as an ISO-8601 string with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ── Conversation entries ──

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: now_iso(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EntryMetadata {
    pub intent: String,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_price: Option<f64>,
    pub business_type: String,
    pub complexity: Complexity,
    /// Insertion-ordered; uniqueness is the editor's job.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self {
            intent: "discount_request".into(),
            outcome: "in_progress".into(),
            final_price: None,
            business_type: "retail".into(),
            complexity: Complexity::Medium,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConversationEntry {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub metadata: EntryMetadata,
    pub created_at: String,
    #[serde(default)]
    pub is_favorite: bool,
}

/// Editor model for an entry. `id == None` means the entry has never been
/// stored.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EntryDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub metadata: EntryMetadata,
    #[serde(default)]
    pub is_favorite: bool,
}

impl EntryDraft {
    /// The pre-filled entry offered by "New Entry".
    pub fn template() -> Self {
        Self {
            id: None,
            title: "New Negotiation".into(),
            messages: vec![
                Message::new(
                    Role::User,
                    "I'm interested in your product, but the price seems a bit high.",
                ),
                Message::new(
                    Role::Assistant,
                    "I understand your concern. Let me see what I can do for you. What price range were you thinking?",
                ),
            ],
            metadata: EntryMetadata::default(),
            is_favorite: false,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

impl From<ConversationEntry> for EntryDraft {
    fn from(entry: ConversationEntry) -> Self {
        Self {
            id: Some(entry.id),
            title: entry.title,
            messages: entry.messages,
            metadata: entry.metadata,
            is_favorite: entry.is_favorite,
        }
    }
}

// ── Simulation sessions ──

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SimMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionMetadata {
    pub intent: String,
    pub business_type: String,
    pub complexity: Complexity,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            intent: "discount_request".into(),
            business_type: "retail".into(),
            complexity: Complexity::Medium,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SimulationSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<SimMessage>,
    pub scenario: String,
    pub created_at: String,
    pub metadata: SessionMetadata,
}

impl SimulationSession {
    pub fn fresh() -> Self {
        Self {
            id: new_id(),
            title: "New Simulation".into(),
            messages: Vec::new(),
            scenario: String::new(),
            created_at: now_iso(),
            metadata: SessionMetadata::default(),
        }
    }
}

// ── Table datasets ──

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HeaderType {
    Text,
    Number,
    Select,
}

impl HeaderType {
    pub fn as_str(self) -> &'static str {
        match self {
            HeaderType::Text => "text",
            HeaderType::Number => "number",
            HeaderType::Select => "select",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TableHeader {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: HeaderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Choice(String),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Text(s) | CellValue::Choice(s) => s.trim().is_empty(),
            CellValue::Number(n) => !n.is_finite(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TableEntry {
    pub id: String,
    /// Keyed by header id.
    pub data: BTreeMap<String, CellValue>,
}

impl TableEntry {
    pub fn has_value(&self) -> bool {
        self.data.values().any(|v| !v.is_blank())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TableDataset {
    pub id: String,
    pub headers: Vec<TableHeader>,
    pub entries: Vec<TableEntry>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

// ── Prompt versions ──

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FewShotExample {
    pub id: String,
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PromptParameters {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

impl Default for PromptParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PromptVersion {
    pub id: String,
    pub version: String,
    pub system_prompt: String,
    #[serde(default)]
    pub few_shot_examples: Vec<FewShotExample>,
    pub parameters: PromptParameters,
    pub created_at: String,
    #[serde(default)]
    pub notes: String,
}
