pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filter;
pub mod llm;
pub mod notify;
pub mod store;

use std::sync::Arc;

use api::{BackendApi, HttpBackend};
use config::AppConfig;
use db::{Database, MemoryStorage, Storage};
use error::AppResult;
use filter::{EntryFilter, Selection};
use notify::{LogNotifier, Notifier};
use store::{
    EntryStore, PromptStore, ProviderSettings, SessionStore, Simulator, TableBuilder,
    TableDatasetStore,
};

/// Everything the command layer works against: the persisted stores plus
/// the transient UI state (filter, selection, builder, live simulation).
pub struct AppState {
    pub config: AppConfig,
    pub entries: EntryStore,
    pub sessions: SessionStore,
    pub prompts: PromptStore,
    pub providers: ProviderSettings,
    pub tables: TableDatasetStore,
    pub builder: TableBuilder,
    pub simulator: Simulator,
    pub filter: EntryFilter,
    pub selection: Selection,
    pub backend: Arc<dyn BackendApi>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Opens the SQLite store under the configured data dir.
    pub fn open(config: AppConfig) -> AppResult<Self> {
        let data_dir = config.resolved_data_dir();
        let database = Database::new(&data_dir)?;
        tracing::info!(path = %data_dir.display(), "opened data store");
        Ok(Self::with_storage(config, Arc::new(database), Arc::new(LogNotifier)))
    }

    pub fn with_storage(
        config: AppConfig,
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let backend: Arc<dyn BackendApi> = Arc::new(HttpBackend::new(&config.backend_url));
        Self {
            entries: EntryStore::load(storage.clone(), notifier.clone()),
            sessions: SessionStore::load(storage.clone(), notifier.clone()),
            prompts: PromptStore::load(storage.clone(), notifier.clone()),
            providers: ProviderSettings::load(storage.clone(), notifier.clone()),
            tables: TableDatasetStore::load(storage, notifier.clone()),
            builder: TableBuilder::new(),
            simulator: Simulator::new(),
            filter: EntryFilter::default(),
            selection: Selection::new(),
            backend,
            notifier,
            config,
        }
    }

    /// A throwaway state backed by memory, for tests and dry runs.
    pub fn in_memory(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_storage(AppConfig::default(), Arc::new(MemoryStorage::new()), notifier)
    }
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_tracing(filter: &str) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
