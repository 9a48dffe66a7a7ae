use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::error::ErrorKind;
use tracing::{info, warn};

use crate::view::{log_missing, MessageId, StatusKind, StatusMessage, View};

pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);
pub const NETWORK_ERROR_TEXT: &str = "Network error!";

/// Transient notifications that remove themselves after a fixed delay.
pub struct StatusMessageBus {
    view: Arc<dyn View>,
    next_id: AtomicU64,
    dismiss_after: Duration,
}

impl StatusMessageBus {
    pub fn new(view: Arc<dyn View>, dismiss_after: Duration) -> Self {
        Self {
            view,
            next_id: AtomicU64::new(1),
            dismiss_after,
        }
    }

    pub fn success(&self, text: impl Into<String>) -> MessageId {
        self.show(StatusKind::Success, text.into())
    }

    pub fn error(&self, text: impl Into<String>) -> MessageId {
        self.show(StatusKind::Error, text.into())
    }

    /// Surfaces a failed action: server verdicts go through `on_rejected`,
    /// round-trip failures collapse into the generic network message.
    pub fn report_failure(
        &self,
        err: &ErrorKind,
        on_rejected: impl FnOnce(&str) -> String,
    ) -> Option<MessageId> {
        match err {
            ErrorKind::Rejected(reason) => Some(self.error(on_rejected(reason))),
            err if err.is_connection_failure() => {
                warn!(error = %err, "action failed in transit");
                Some(self.error(NETWORK_ERROR_TEXT))
            }
            ErrorKind::Busy(_) | ErrorKind::MissingTarget(_) => {
                info!(error = %err, "action skipped");
                None
            }
            other => Some(self.error(other.to_string())),
        }
    }

    fn show(&self, kind: StatusKind, text: String) -> MessageId {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let message = StatusMessage { id, kind, text };
        if let Err(missing) = self.view.show_message(&message) {
            let error = ErrorKind::from(missing);
            warn!(%error, "status container missing; message dropped");
            return id;
        }

        let view = Arc::clone(&self.view);
        let dismiss_after = self.dismiss_after;
        tokio::spawn(async move {
            tokio::time::sleep(dismiss_after).await;
            log_missing(view.dismiss_message(id));
        });
        id
    }
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
