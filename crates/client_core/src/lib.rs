use std::sync::Arc;

use shared::error::ErrorKind;

pub mod admin;
pub mod offline;
pub mod panel;
pub mod pending;
pub mod request;
pub mod session;
pub mod settings;
pub mod status;
pub mod timer;
pub mod view;

pub use admin::AdminActions;
pub use offline::{AssetSource, CacheStorage, CachedAsset, OfflineCache};
pub use panel::{ActivationReport, ManualErrorPanel, SelectionSummary, SummaryLine};
pub use pending::{PendingControls, PendingGuard};
pub use relay_test::{RelayStatusReport, RelayTestPanel};
pub use request::{ActionClient, Endpoint};
pub use session::{CompletionSummary, FinishOutcome, PhaseKind, SessionController, SessionPhase, SessionState};
pub use settings::{load_settings, load_settings_from, Settings};
pub use status::StatusMessageBus;
pub use timer::CountdownTimer;
pub use view::{Control, InputField, MessageId, MissingTarget, Render, StatusKind, StatusMessage, View};

/// Collaborators shared by every controller of one front end.
#[derive(Clone)]
pub struct UiContext {
    pub actions: ActionClient,
    pub view: Arc<dyn View>,
    pub status: Arc<StatusMessageBus>,
    pub pending: Arc<PendingControls>,
    pub settings: Arc<Settings>,
}

impl UiContext {
    pub fn new(settings: Settings, view: Arc<dyn View>) -> Result<Self, ErrorKind> {
        let actions = ActionClient::new(&settings.server_url, settings.request_timeout())?;
        Ok(Self {
            actions,
            status: Arc::new(StatusMessageBus::new(
                Arc::clone(&view),
                settings.status_dismiss_after(),
            )),
            pending: Arc::new(PendingControls::new(Arc::clone(&view))),
            view,
            settings: Arc::new(settings),
        })
    }

    /// Offline cache configured from these settings on the process-wide storage.
    pub fn offline_cache(&self) -> OfflineCache {
        OfflineCache::new(
            self.settings.cache_name.clone(),
            self.settings.cache_manifest.clone(),
            CacheStorage::global(),
            self.actions.clone(),
        )
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
