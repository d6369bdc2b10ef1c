//! Fine-tuning dataset exports: JSON Lines for training, CSV for analysis.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::models::{ConversationEntry, EntryMetadata, Message};
use crate::error::{AppResult, ValidationError};
use crate::filter::{selected_view, EntryFilter, Selection};

/// System turn prepended to every JSONL record. It is fixed and does not
/// follow the prompt manager's current version.
pub const FIXED_SYSTEM_PROMPT: &str = "You are DealMind, an expert AI negotiation assistant helping businesses close deals while maintaining customer satisfaction.";

pub const CSV_COLUMNS: [&str; 11] = [
    "id",
    "title",
    "user_message",
    "assistant_response",
    "intent",
    "outcome",
    "business_type",
    "complexity",
    "final_price",
    "tags",
    "created_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Jsonl,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Jsonl => "application/jsonl",
            ExportFormat::Csv => "text/csv",
        }
    }

    pub fn file_name(self, date: NaiveDate) -> String {
        let stem = match self {
            ExportFormat::Jsonl => "dealMind_training",
            ExportFormat::Csv => "dealMind_dataset",
        };
        format!("{stem}_{}.{}", date.format("%Y-%m-%d"), self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub include_metadata: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Jsonl,
            include_metadata: true,
        }
    }
}

/// A rendered export, ready to be written out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportFile {
    pub filename: String,
    pub mime_type: &'static str,
    pub content: String,
    pub conversations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub conversations: usize,
    pub total_messages: usize,
    pub format: ExportFormat,
    pub include_metadata: bool,
}

// ── JSONL ──

#[derive(Serialize)]
#[serde(untagged)]
enum TrainingMessage<'a> {
    System { role: &'static str, content: &'a str },
    Turn(&'a Message),
}

#[derive(Serialize)]
struct RecordDetails<'a> {
    metadata: &'a EntryMetadata,
    id: &'a str,
    title: &'a str,
    created_at: &'a str,
}

#[derive(Serialize)]
struct TrainingRecord<'a> {
    messages: Vec<TrainingMessage<'a>>,
    #[serde(flatten)]
    details: Option<RecordDetails<'a>>,
}

fn training_record(entry: &ConversationEntry, include_metadata: bool) -> TrainingRecord<'_> {
    let mut messages = Vec::with_capacity(entry.messages.len() + 1);
    messages.push(TrainingMessage::System {
        role: "system",
        content: FIXED_SYSTEM_PROMPT,
    });
    messages.extend(entry.messages.iter().map(TrainingMessage::Turn));
    let details = include_metadata.then(|| RecordDetails {
        metadata: &entry.metadata,
        id: &entry.id,
        title: &entry.title,
        created_at: &entry.created_at,
    });
    TrainingRecord { messages, details }
}

/// One JSON object per entry, newline separated, no trailing newline.
pub fn to_jsonl(entries: &[&ConversationEntry], include_metadata: bool) -> serde_json::Result<String> {
    let lines = entries
        .iter()
        .map(|e| serde_json::to_string(&training_record(e, include_metadata)))
        .collect::<serde_json::Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}

// ── CSV ──

/// Quotes a field only when it contains a comma.
fn csv_field(value: &str) -> String {
    if value.contains(',') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn price_cell(price: Option<f64>) -> String {
    match price {
        Some(p) if p != 0.0 => p.to_string(),
        _ => String::new(),
    }
}

/// Rows for the message pairs at (0,1), (2,3), ... A trailing unpaired
/// message is dropped.
pub fn csv_rows(entry: &ConversationEntry) -> Vec<[String; 11]> {
    let meta = &entry.metadata;
    entry
        .messages
        .chunks_exact(2)
        .map(|pair| {
            [
                entry.id.clone(),
                entry.title.clone(),
                pair[0].content.clone(),
                pair[1].content.clone(),
                meta.intent.clone(),
                meta.outcome.clone(),
                meta.business_type.clone(),
                meta.complexity.as_str().to_string(),
                price_cell(meta.final_price),
                meta.tags.join(";"),
                entry.created_at.clone(),
            ]
        })
        .collect()
}

pub fn to_csv(entries: &[&ConversationEntry]) -> String {
    let mut lines = vec![CSV_COLUMNS.join(",")];
    for entry in entries {
        for row in csv_rows(entry) {
            let cells: Vec<String> = row.iter().map(|v| csv_field(v)).collect();
            lines.push(cells.join(","));
        }
    }
    lines.join("\n")
}

// ── Export flow ──

fn checked_view<'a>(
    entries: &'a [ConversationEntry],
    filter: &EntryFilter,
    selection: &Selection,
) -> Result<Vec<&'a ConversationEntry>, ValidationError> {
    let view = selected_view(entries, filter, selection);
    if view.is_empty() {
        return Err(ValidationError::NoDataSelected);
    }
    Ok(view)
}

pub fn summarize(
    entries: &[ConversationEntry],
    filter: &EntryFilter,
    selection: &Selection,
    options: ExportOptions,
) -> ExportSummary {
    let view = selected_view(entries, filter, selection);
    ExportSummary {
        conversations: view.len(),
        total_messages: view.iter().map(|e| e.messages.len()).sum(),
        format: options.format,
        include_metadata: options.include_metadata,
    }
}

/// Renders the selected entries that pass `filter`. An empty result is a
/// validation failure and produces no file.
pub fn export(
    entries: &[ConversationEntry],
    filter: &EntryFilter,
    selection: &Selection,
    options: ExportOptions,
    date: NaiveDate,
) -> AppResult<ExportFile> {
    let view = checked_view(entries, filter, selection)?;
    let content = match options.format {
        ExportFormat::Jsonl => to_jsonl(&view, options.include_metadata)?,
        ExportFormat::Csv => to_csv(&view),
    };
    tracing::info!(
        format = options.format.extension(),
        conversations = view.len(),
        bytes = content.len(),
        "export rendered"
    );
    Ok(ExportFile {
        filename: options.format.file_name(date),
        mime_type: options.format.mime_type(),
        content,
        conversations: view.len(),
    })
}

/// A short sample of what the export of the first selected entry looks like.
pub fn preview(
    entries: &[ConversationEntry],
    filter: &EntryFilter,
    selection: &Selection,
    options: ExportOptions,
) -> AppResult<String> {
    let view = checked_view(entries, filter, selection)?;
    let sample = view[0];
    match options.format {
        ExportFormat::Jsonl => {
            let mut head = sample.clone();
            head.messages.truncate(2);
            let record = training_record(&head, false);
            let mut value = serde_json::to_value(&record)?;
            if options.include_metadata {
                value["metadata"] = serde_json::to_value(&sample.metadata)?;
            }
            Ok(serde_json::to_string_pretty(&value)?)
        }
        ExportFormat::Csv => {
            let turns: Vec<&str> = sample.messages.iter().take(2).map(|m| m.content.as_str()).collect();
            let cells = [
                sample.id.as_str(),
                sample.title.as_str(),
                turns.first().copied().unwrap_or(""),
                turns.get(1).copied().unwrap_or(""),
                sample.metadata.intent.as_str(),
                sample.metadata.outcome.as_str(),
            ];
            let row: Vec<String> = cells.iter().map(|c| csv_field(c)).collect();
            Ok(format!("{}\n{}", CSV_COLUMNS[..6].join(","), row.join(",")))
        }
    }
}

/// Writes the export into `dir`, returning the file path.
pub fn write_export(file: &ExportFile, dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&file.filename);
    std::fs::write(&path, file.content.as_bytes())?;
    tracing::info!(path = %path.display(), "export written");
    Ok(path)
}
