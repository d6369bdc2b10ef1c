use serde::Serialize;

use crate::db::models::{HeaderType, TableDataset, TableEntry, TableHeader};
use crate::store::BuilderPhase;
use crate::AppState;

/// What the builder screen renders.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BuilderView {
    pub phase: BuilderPhase,
    pub headers: Vec<TableHeader>,
    pub rows: Vec<TableEntry>,
}

pub fn get_builder(state: &AppState) -> BuilderView {
    BuilderView {
        phase: state.builder.phase(),
        headers: state.builder.headers().to_vec(),
        rows: state.builder.rows().to_vec(),
    }
}

pub fn get_latest_table(state: &AppState) -> Option<TableDataset> {
    state.tables.latest().cloned()
}

pub fn add_table_header(
    state: &mut AppState,
    name: &str,
    kind: HeaderType,
    options: Vec<String>,
) -> Result<TableHeader, String> {
    state
        .builder
        .add_header(name, kind, options)
        .cloned()
        .map_err(|e| e.to_string())
}

pub fn update_table_header(
    state: &mut AppState,
    id: &str,
    name: &str,
    kind: HeaderType,
    options: Vec<String>,
) -> Result<(), String> {
    state
        .builder
        .update_header(id, name, kind, options)
        .map_err(|e| e.to_string())
}

pub fn remove_table_header(state: &mut AppState, id: &str) -> Result<bool, String> {
    state.builder.remove_header(id).map_err(|e| e.to_string())
}

pub fn start_data_entry(state: &mut AppState) -> Result<(), String> {
    state.builder.start_data_entry().map_err(|e| e.to_string())
}

pub fn add_table_row(state: &mut AppState) -> Result<TableEntry, String> {
    state.builder.add_row().cloned().map_err(|e| e.to_string())
}

pub fn remove_table_row(state: &mut AppState, id: &str) -> Result<bool, String> {
    state.builder.remove_row(id).map_err(|e| e.to_string())
}

pub fn set_table_cell(
    state: &mut AppState,
    row_id: &str,
    header_id: &str,
    raw: &str,
) -> Result<(), String> {
    state
        .builder
        .set_cell_input(row_id, header_id, raw)
        .map_err(|e| e.to_string())
}

pub fn save_table(state: &mut AppState) -> Result<TableDataset, String> {
    let AppState { builder, tables, .. } = state;
    builder.save(tables).map_err(|e| e.to_string())
}

pub fn cancel_table(state: &mut AppState) {
    state.builder.cancel();
}
