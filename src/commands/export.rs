use serde::Serialize;
use std::path::PathBuf;

use crate::export::{self, ExportOptions, ExportSummary};
use crate::notify::{Notification, Notifier};
use crate::AppState;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub conversations: usize,
}

pub fn export_summary(state: &AppState, options: ExportOptions) -> ExportSummary {
    export::summarize(state.entries.entries(), &state.filter, &state.selection, options)
}

pub fn preview_export(state: &AppState, options: ExportOptions) -> Result<String, String> {
    export::preview(state.entries.entries(), &state.filter, &state.selection, options)
        .map_err(|e| e.to_string())
}

/// Renders the selection and writes it into the configured export dir.
pub fn export_dataset(state: &AppState, options: ExportOptions) -> Result<ExportedFile, String> {
    let today = chrono::Utc::now().date_naive();
    let file = match export::export(
        state.entries.entries(),
        &state.filter,
        &state.selection,
        options,
        today,
    ) {
        Ok(file) => file,
        Err(e) => {
            state.notifier.notify(Notification::failure("No data selected", e.to_string()));
            return Err(e.to_string());
        }
    };
    let path = export::write_export(&file, &state.config.export_dir).map_err(|e| e.to_string())?;
    state.notifier.notify(Notification::success(
        "Export successful",
        format!(
            "Exported {} conversations as {}",
            file.conversations,
            options.format.extension().to_uppercase()
        ),
    ));
    Ok(ExportedFile {
        path,
        mime_type: file.mime_type,
        conversations: file.conversations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::entries::{new_entry_draft, save_entry, select_all_filtered};
    use crate::export::ExportFormat;
    use crate::notify::{Level, NotificationLog};
    use std::sync::Arc;

    #[test]
    fn export_writes_selected_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = Arc::new(NotificationLog::new());
        let mut state = AppState::in_memory(log.clone());
        state.config.export_dir = dir.path().to_path_buf();
        save_entry(&mut state, new_entry_draft()).unwrap();
        select_all_filtered(&mut state);

        let options = ExportOptions {
            format: ExportFormat::Csv,
            include_metadata: true,
        };
        let out = export_dataset(&state, options).unwrap();
        assert_eq!(out.conversations, 1);
        assert_eq!(out.mime_type, "text/csv");
        let name = out.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("dealMind_dataset_") && name.ends_with(".csv"));
        let written = std::fs::read_to_string(&out.path).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert_eq!(log.last().unwrap().title, "Export successful");
    }

    #[test]
    fn empty_selection_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = Arc::new(NotificationLog::new());
        let mut state = AppState::in_memory(log.clone());
        state.config.export_dir = dir.path().join("out");
        save_entry(&mut state, new_entry_draft()).unwrap();

        let err = export_dataset(&state, ExportOptions::default()).unwrap_err();
        assert!(err.starts_with("No data selected"));
        assert_eq!(log.last().unwrap().level, Level::Failure);
        assert!(!dir.path().join("out").exists());
        assert_eq!(export_summary(&state, ExportOptions::default()).conversations, 0);
    }
}
