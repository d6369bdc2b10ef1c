use serde::Serialize;
use std::sync::Arc;

use super::announce;
use crate::db::models::{new_id, now_iso, CellValue, HeaderType, TableDataset, TableEntry, TableHeader};
use crate::db::{load_json, save_json, Storage, TABLE_DATA_KEY};
use crate::error::{AppResult, ValidationError};
use crate::notify::{Notification, Notifier};

/// Holds the most recently saved table dataset. Saving replaces it.
pub struct TableDatasetStore {
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    latest: Option<TableDataset>,
}

impl TableDatasetStore {
    pub fn load(storage: Arc<dyn Storage>, notifier: Arc<dyn Notifier>) -> Self {
        let latest = load_json(storage.as_ref(), TABLE_DATA_KEY);
        Self {
            storage,
            notifier,
            latest,
        }
    }

    pub fn latest(&self) -> Option<&TableDataset> {
        self.latest.as_ref()
    }

    pub fn save(&mut self, dataset: TableDataset) -> AppResult<()> {
        let flushed = save_json(self.storage.as_ref(), TABLE_DATA_KEY, &dataset);
        let rows = dataset.entries.len();
        self.latest = Some(dataset);
        announce(
            self.notifier.as_ref(),
            flushed,
            "Table data saved",
            format!("Saved {rows} rows."),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderPhase {
    DefiningHeaders,
    EnteringData,
}

impl BuilderPhase {
    fn describe(self) -> &'static str {
        match self {
            BuilderPhase::DefiningHeaders => "defining headers",
            BuilderPhase::EnteringData => "entering data",
        }
    }
}

/// Two-step table authoring: define the columns, then fill in rows.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    phase: BuilderPhase,
    headers: Vec<TableHeader>,
    rows: Vec<TableEntry>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn clean_options(kind: HeaderType, options: Vec<String>) -> Option<Vec<String>> {
    if kind != HeaderType::Select {
        return None;
    }
    let mut out: Vec<String> = Vec::new();
    for opt in options {
        let opt = opt.trim();
        if !opt.is_empty() && !out.iter().any(|o| o == opt) {
            out.push(opt.to_string());
        }
    }
    Some(out)
}

impl TableBuilder {
    pub fn new() -> Self {
        Self {
            phase: BuilderPhase::DefiningHeaders,
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn phase(&self) -> BuilderPhase {
        self.phase
    }

    pub fn headers(&self) -> &[TableHeader] {
        &self.headers
    }

    pub fn rows(&self) -> &[TableEntry] {
        &self.rows
    }

    fn require(&self, phase: BuilderPhase) -> Result<(), ValidationError> {
        if self.phase != phase {
            return Err(ValidationError::WrongPhase(self.phase.describe()));
        }
        Ok(())
    }

    fn header(&self, id: &str) -> Result<&TableHeader, ValidationError> {
        self.headers
            .iter()
            .find(|h| h.id == id)
            .ok_or_else(|| ValidationError::UnknownHeader(id.to_string()))
    }

    fn row_mut(&mut self, id: &str) -> Result<&mut TableEntry, ValidationError> {
        self.rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ValidationError::UnknownRow(id.to_string()))
    }

    // ── Defining headers ──

    pub fn add_header(
        &mut self,
        name: &str,
        kind: HeaderType,
        options: Vec<String>,
    ) -> Result<&TableHeader, ValidationError> {
        self.require(BuilderPhase::DefiningHeaders)?;
        let idx = self.headers.len();
        self.headers.push(TableHeader {
            id: new_id(),
            name: name.trim().to_string(),
            kind,
            options: clean_options(kind, options),
        });
        Ok(&self.headers[idx])
    }

    pub fn update_header(
        &mut self,
        id: &str,
        name: &str,
        kind: HeaderType,
        options: Vec<String>,
    ) -> Result<(), ValidationError> {
        self.require(BuilderPhase::DefiningHeaders)?;
        let header = self
            .headers
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| ValidationError::UnknownHeader(id.to_string()))?;
        header.name = name.trim().to_string();
        header.kind = kind;
        header.options = clean_options(kind, options);
        Ok(())
    }

    pub fn remove_header(&mut self, id: &str) -> Result<bool, ValidationError> {
        self.require(BuilderPhase::DefiningHeaders)?;
        let before = self.headers.len();
        self.headers.retain(|h| h.id != id);
        Ok(before != self.headers.len())
    }

    /// Moves on to row entry. Needs at least one header.
    pub fn start_data_entry(&mut self) -> Result<(), ValidationError> {
        self.require(BuilderPhase::DefiningHeaders)?;
        if self.headers.is_empty() {
            return Err(ValidationError::NoHeaders);
        }
        self.phase = BuilderPhase::EnteringData;
        Ok(())
    }

    // ── Entering data ──

    pub fn add_row(&mut self) -> Result<&TableEntry, ValidationError> {
        self.require(BuilderPhase::EnteringData)?;
        let idx = self.rows.len();
        self.rows.push(TableEntry {
            id: new_id(),
            ..TableEntry::default()
        });
        Ok(&self.rows[idx])
    }

    pub fn remove_row(&mut self, id: &str) -> Result<bool, ValidationError> {
        self.require(BuilderPhase::EnteringData)?;
        let before = self.rows.len();
        self.rows.retain(|r| r.id != id);
        Ok(before != self.rows.len())
    }

    /// Writes a cell after checking the value against the column type.
    pub fn set_cell(
        &mut self,
        row_id: &str,
        header_id: &str,
        value: CellValue,
    ) -> Result<(), ValidationError> {
        self.require(BuilderPhase::EnteringData)?;
        let header = self.header(header_id)?;
        if let CellValue::Number(n) = value {
            if !n.is_finite() {
                return Err(ValidationError::InvalidNumber(n.to_string()));
            }
        }
        match (&header.kind, &value) {
            (HeaderType::Text, CellValue::Text(_)) | (HeaderType::Number, CellValue::Number(_)) => {}
            (HeaderType::Select, CellValue::Choice(choice)) => {
                let allowed = header.options.as_deref().unwrap_or_default();
                if !allowed.iter().any(|o| o == choice) {
                    return Err(ValidationError::UnknownOption {
                        header: header.name.clone(),
                        value: choice.clone(),
                    });
                }
            }
            (kind, _) => {
                return Err(ValidationError::CellTypeMismatch {
                    header: header.name.clone(),
                    expected: kind.as_str(),
                })
            }
        }
        let header_id = header.id.clone();
        self.row_mut(row_id)?.data.insert(header_id, value);
        Ok(())
    }

    /// Writes a cell from raw form input, parsed by the column type. Blank
    /// input clears the cell.
    pub fn set_cell_input(
        &mut self,
        row_id: &str,
        header_id: &str,
        raw: &str,
    ) -> Result<(), ValidationError> {
        self.require(BuilderPhase::EnteringData)?;
        let kind = self.header(header_id)?.kind;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return self.clear_cell(row_id, header_id);
        }
        let value = match kind {
            HeaderType::Text => CellValue::Text(raw.to_string()),
            HeaderType::Number => CellValue::Number(
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| ValidationError::InvalidNumber(trimmed.to_string()))?,
            ),
            HeaderType::Select => CellValue::Choice(trimmed.to_string()),
        };
        self.set_cell(row_id, header_id, value)
    }

    pub fn clear_cell(&mut self, row_id: &str, header_id: &str) -> Result<(), ValidationError> {
        self.require(BuilderPhase::EnteringData)?;
        self.row_mut(row_id)?.data.remove(header_id);
        Ok(())
    }

    /// Persists the non-empty rows as the table snapshot and starts over.
    /// If the write fails the rows stay in place so the save can be retried.
    pub fn save(&mut self, store: &mut TableDatasetStore) -> AppResult<TableDataset> {
        self.require(BuilderPhase::EnteringData)?;
        let entries: Vec<TableEntry> = self.rows.iter().filter(|r| r.has_value()).cloned().collect();
        if entries.is_empty() {
            store.notifier.notify(Notification::failure(
                "Nothing to save",
                ValidationError::NoRows.to_string(),
            ));
            return Err(ValidationError::NoRows.into());
        }
        let dataset = TableDataset {
            id: new_id(),
            headers: self.headers.clone(),
            entries,
            created_at: now_iso(),
        };
        store.save(dataset.clone())?;
        tracing::info!(id = %dataset.id, rows = dataset.entries.len(), "table dataset saved");
        self.cancel();
        Ok(dataset)
    }

    /// Drops everything and returns to header definition.
    pub fn cancel(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;
    use crate::error::AppError;
    use crate::notify::NotificationLog;

    fn dataset_store() -> (TableDatasetStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = TableDatasetStore::load(storage.clone(), Arc::new(NotificationLog::new()));
        (store, storage)
    }

    fn builder_with_columns() -> (TableBuilder, String, String, String) {
        let mut b = TableBuilder::new();
        let name = b.add_header("Product", HeaderType::Text, vec![]).unwrap().id.clone();
        let price = b.add_header("Price", HeaderType::Number, vec![]).unwrap().id.clone();
        let outcome = b
            .add_header(
                "Outcome",
                HeaderType::Select,
                vec!["won".into(), " lost ".into(), "won".into(), "".into()],
            )
            .unwrap()
            .id
            .clone();
        b.start_data_entry().unwrap();
        (b, name, price, outcome)
    }

    #[test]
    fn data_entry_requires_a_header() {
        let mut b = TableBuilder::new();
        assert_eq!(b.start_data_entry(), Err(ValidationError::NoHeaders));
        assert_eq!(b.phase(), BuilderPhase::DefiningHeaders);

        b.add_header("Notes", HeaderType::Text, vec![]).unwrap();
        b.start_data_entry().unwrap();
        assert_eq!(b.phase(), BuilderPhase::EnteringData);
    }

    #[test]
    fn select_options_are_cleaned() {
        let (b, _, _, outcome) = builder_with_columns();
        let header = b.headers().iter().find(|h| h.id == outcome).unwrap();
        assert_eq!(header.options.as_deref().unwrap(), ["won", "lost"]);
        assert!(b.headers()[0].options.is_none());
    }

    #[test]
    fn phase_guards_operations() {
        let mut b = TableBuilder::new();
        assert!(matches!(b.add_row(), Err(ValidationError::WrongPhase(_))));
        b.add_header("A", HeaderType::Text, vec![]).unwrap();
        b.start_data_entry().unwrap();
        assert!(matches!(
            b.add_header("B", HeaderType::Text, vec![]),
            Err(ValidationError::WrongPhase(_))
        ));
    }

    #[test]
    fn cells_are_checked_against_column_type() {
        let (mut b, name, price, outcome) = builder_with_columns();
        let row = b.add_row().unwrap().id.clone();

        assert!(matches!(
            b.set_cell(&row, &price, CellValue::Text("cheap".into())),
            Err(ValidationError::CellTypeMismatch { .. })
        ));
        assert!(matches!(
            b.set_cell(&row, &outcome, CellValue::Choice("maybe".into())),
            Err(ValidationError::UnknownOption { .. })
        ));
        assert_eq!(
            b.set_cell_input(&row, &price, "abc"),
            Err(ValidationError::InvalidNumber("abc".into()))
        );
        assert!(matches!(
            b.set_cell(&row, "nope", CellValue::Text("x".into())),
            Err(ValidationError::UnknownHeader(_))
        ));

        b.set_cell_input(&row, &name, "Laptop").unwrap();
        b.set_cell_input(&row, &price, " 999.5 ").unwrap();
        b.set_cell_input(&row, &outcome, "won").unwrap();
        let data = &b.rows()[0].data;
        assert_eq!(data[&price], CellValue::Number(999.5));
        assert_eq!(data[&outcome], CellValue::Choice("won".into()));

        b.set_cell_input(&row, &name, "  ").unwrap();
        assert!(!b.rows()[0].data.contains_key(&name));
    }

    #[test]
    fn non_finite_numbers_are_rejected_and_snapshot_reloads() {
        let (mut store, storage) = dataset_store();
        let (mut b, name, price, _) = builder_with_columns();
        let row = b.add_row().unwrap().id.clone();

        for raw in ["inf", "-inf", "NaN", "infinity"] {
            assert_eq!(
                b.set_cell_input(&row, &price, raw),
                Err(ValidationError::InvalidNumber(raw.into()))
            );
        }
        assert!(matches!(
            b.set_cell(&row, &price, CellValue::Number(f64::INFINITY)),
            Err(ValidationError::InvalidNumber(_))
        ));
        assert!(!b.rows()[0].data.contains_key(&price));

        b.set_cell_input(&row, &name, "Chair").unwrap();
        b.set_cell_input(&row, &price, "120").unwrap();
        let saved = b.save(&mut store).unwrap();

        let reloaded = TableDatasetStore::load(storage, Arc::new(NotificationLog::new()));
        assert_eq!(reloaded.latest(), Some(&saved));
    }

    #[test]
    fn all_blank_rows_cannot_be_saved() {
        let (mut store, storage) = dataset_store();
        let (mut b, name, _, _) = builder_with_columns();
        let row = b.add_row().unwrap().id.clone();
        b.add_row().unwrap();
        b.set_cell(&row, &name, CellValue::Text("   ".into())).unwrap();

        let err = b.save(&mut store).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::NoRows)));
        assert_eq!(b.phase(), BuilderPhase::EnteringData);
        assert_eq!(b.rows().len(), 2);
        assert!(storage.raw(TABLE_DATA_KEY).is_none());
    }

    #[test]
    fn save_keeps_non_empty_rows_and_resets() {
        let (mut store, storage) = dataset_store();
        let (mut b, name, _, _) = builder_with_columns();
        let filled = b.add_row().unwrap().id.clone();
        b.add_row().unwrap();
        b.set_cell_input(&filled, &name, "Phone").unwrap();

        let saved = b.save(&mut store).unwrap();
        assert_eq!(saved.entries.len(), 1);
        assert_eq!(saved.headers.len(), 3);
        assert_eq!(b.phase(), BuilderPhase::DefiningHeaders);
        assert!(b.headers().is_empty() && b.rows().is_empty());

        let stored: TableDataset = serde_json::from_str(&storage.raw(TABLE_DATA_KEY).unwrap()).unwrap();
        assert_eq!(stored, saved);
    }

    #[test]
    fn second_dataset_overwrites_first() {
        let (mut store, storage) = dataset_store();
        for label in ["first", "second"] {
            let mut b = TableBuilder::new();
            let h = b.add_header("Label", HeaderType::Text, vec![]).unwrap().id.clone();
            b.start_data_entry().unwrap();
            let r = b.add_row().unwrap().id.clone();
            b.set_cell_input(&r, &h, label).unwrap();
            b.save(&mut store).unwrap();
        }
        let reloaded = TableDatasetStore::load(storage, Arc::new(NotificationLog::new()));
        let latest = reloaded.latest().unwrap();
        let value = latest.entries[0].data.values().next().unwrap();
        assert_eq!(value, &CellValue::Text("second".into()));
    }

    #[test]
    fn failed_write_keeps_rows_for_retry() {
        let (mut store, storage) = dataset_store();
        let (mut b, name, _, _) = builder_with_columns();
        let row = b.add_row().unwrap().id.clone();
        b.set_cell_input(&row, &name, "Desk").unwrap();

        storage.fail_writes(true);
        assert!(matches!(b.save(&mut store), Err(AppError::Storage(_))));
        assert_eq!(b.rows().len(), 1);

        storage.fail_writes(false);
        b.save(&mut store).unwrap();
        assert!(b.rows().is_empty());
    }

    #[test]
    fn cancel_discards_without_saving() {
        let (store, _) = dataset_store();
        let (mut b, _, _, _) = builder_with_columns();
        b.add_row().unwrap();
        b.cancel();
        assert_eq!(b.phase(), BuilderPhase::DefiningHeaders);
        assert!(b.headers().is_empty());
        assert!(store.latest().is_none());
    }
}
