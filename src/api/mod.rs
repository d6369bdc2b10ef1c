//! Client for the collaborating REST backend. Every call is a single
//! request; a non-success status is surfaced as an error without retry.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::{ConversationEntry, EntryMetadata, Message, TableEntry, TableHeader, TableDataset};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Conversation body for creation; the backend assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConversation {
    pub title: String,
    pub messages: Vec<Message>,
    pub metadata: EntryMetadata,
    pub is_favorite: bool,
}

impl From<&ConversationEntry> for NewConversation {
    fn from(entry: &ConversationEntry) -> Self {
        Self {
            title: entry.title.clone(),
            messages: entry.messages.clone(),
            metadata: entry.metadata.clone(),
            is_favorite: entry.is_favorite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTableData {
    pub headers: Vec<TableHeader>,
    pub entries: Vec<TableEntry>,
}

impl From<&TableDataset> for NewTableData {
    fn from(dataset: &TableDataset) -> Self {
        Self {
            headers: dataset.headers.clone(),
            entries: dataset.entries.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    Training,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainedModel {
    pub id: String,
    pub name: String,
    pub accuracy: f64,
    pub loss: f64,
    pub training_date: String,
    pub status: TrainingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrainedModel {
    pub name: String,
    pub accuracy: f64,
    pub loss: f64,
    pub status: TrainingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingConfig {
    pub batch_size: u32,
    pub test_size: u32,
    pub training_size: u32,
    pub epochs: u32,
    pub learning_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            test_size: 20,
            training_size: 80,
            epochs: 10,
            learning_rate: 0.001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub dataset: String,
    pub config: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub data: serde_json::Value,
    pub filename: String,
}

#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn conversations(&self) -> Result<Vec<ConversationEntry>, ApiError>;
    async fn create_conversation(&self, body: &NewConversation) -> Result<ConversationEntry, ApiError>;
    async fn update_conversation(&self, entry: &ConversationEntry) -> Result<ConversationEntry, ApiError>;
    async fn delete_conversation(&self, id: &str) -> Result<(), ApiError>;
    async fn table_data(&self) -> Result<Vec<TableDataset>, ApiError>;
    async fn save_table_data(&self, body: &NewTableData) -> Result<TableDataset, ApiError>;
    async fn trained_models(&self) -> Result<Vec<TrainedModel>, ApiError>;
    async fn save_trained_model(&self, body: &NewTrainedModel) -> Result<TrainedModel, ApiError>;
    async fn start_training(&self, request: &TrainingRequest) -> Result<serde_json::Value, ApiError>;
    async fn export_data(&self, data_type: &str) -> Result<ExportPayload, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "backend request failed");
            return Err(ApiError::Status { status, message });
        }
        Ok(resp)
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let resp = self.send(req).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn conversations(&self) -> Result<Vec<ConversationEntry>, ApiError> {
        self.fetch(self.client.get(self.url("/api/conversations"))).await
    }

    async fn create_conversation(&self, body: &NewConversation) -> Result<ConversationEntry, ApiError> {
        self.fetch(self.client.post(self.url("/api/conversations")).json(body))
            .await
    }

    async fn update_conversation(&self, entry: &ConversationEntry) -> Result<ConversationEntry, ApiError> {
        let url = self.url(&format!("/api/conversations/{}", entry.id));
        self.fetch(self.client.put(url).json(entry)).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/conversations/{id}"));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn table_data(&self) -> Result<Vec<TableDataset>, ApiError> {
        self.fetch(self.client.get(self.url("/api/table-data"))).await
    }

    async fn save_table_data(&self, body: &NewTableData) -> Result<TableDataset, ApiError> {
        self.fetch(self.client.post(self.url("/api/table-data")).json(body))
            .await
    }

    async fn trained_models(&self) -> Result<Vec<TrainedModel>, ApiError> {
        self.fetch(self.client.get(self.url("/api/models"))).await
    }

    async fn save_trained_model(&self, body: &NewTrainedModel) -> Result<TrainedModel, ApiError> {
        self.fetch(self.client.post(self.url("/api/models")).json(body))
            .await
    }

    async fn start_training(&self, request: &TrainingRequest) -> Result<serde_json::Value, ApiError> {
        self.fetch(self.client.post(self.url("/api/models/train")).json(request))
            .await
    }

    async fn export_data(&self, data_type: &str) -> Result<ExportPayload, ApiError> {
        let url = self.url(&format!("/api/export/{data_type}"));
        self.fetch(self.client.get(url)).await
    }
}
