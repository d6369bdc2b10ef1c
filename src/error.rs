use serde::Serialize;
use thiserror::Error;

use crate::api::ApiError;
use crate::db::StorageError;
use crate::llm::ProviderError;

/// User-correctable failures. These leave state untouched and are shown
/// to the user as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("No data selected: select at least one conversation to export")]
    NoDataSelected,
    #[error("Add at least one header before entering data")]
    NoHeaders,
    #[error("Add at least one row with a value before saving")]
    NoRows,
    #[error("Please provide both input and output for the example")]
    IncompleteExample,
    #[error("Not available while {0}")]
    WrongPhase(&'static str),
    #[error("Unknown header: {0}")]
    UnknownHeader(String),
    #[error("Unknown row: {0}")]
    UnknownRow(String),
    #[error("Column `{header}` expects a {expected} value")]
    CellTypeMismatch { header: String, expected: &'static str },
    #[error("`{value}` is not an option of column `{header}`")]
    UnknownOption { header: String, value: String },
    #[error("`{0}` is not a number")]
    InvalidNumber(String),
    #[error("{name} must be between {min} and {max}, got {value}")]
    ParameterOutOfRange {
        name: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("Model not configured: please configure {0} before testing")]
    ProviderNotConfigured(String),
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
