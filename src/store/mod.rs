pub mod entries;
pub mod prompts;
pub mod providers;
pub mod sessions;
pub mod table;

pub use entries::EntryStore;
pub use prompts::PromptStore;
pub use providers::ProviderSettings;
pub use sessions::{SessionStore, Simulator};
pub use table::{BuilderPhase, TableBuilder, TableDatasetStore};

use crate::db::StorageError;
use crate::error::AppResult;
use crate::notify::{Notification, Notifier};

/// Turns the outcome of a write-through flush into a toast. The in-memory
/// change has already happened either way.
pub(crate) fn announce(
    notifier: &dyn Notifier,
    flushed: Result<(), StorageError>,
    title: &str,
    description: impl Into<String>,
) -> AppResult<()> {
    match flushed {
        Ok(()) => {
            notifier.notify(Notification::success(title, description));
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "write-through flush failed");
            notifier.notify(Notification::failure(
                "Save failed",
                format!("Changes are kept for this session but could not be stored: {e}"),
            ));
            Err(e.into())
        }
    }
}
