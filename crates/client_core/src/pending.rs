use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::error::ErrorKind;
use tracing::debug;

use crate::view::{log_missing, Control, View};

/// Tracks which controls have a request in flight.
pub struct PendingControls {
    view: Arc<dyn View>,
    in_flight: Mutex<HashSet<Control>>,
}

impl PendingControls {
    pub fn new(view: Arc<dyn View>) -> Self {
        Self {
            view,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Marks `control` busy until the returned guard is dropped.
    pub fn acquire(self: &Arc<Self>, control: Control) -> Result<PendingGuard, ErrorKind> {
        if !self.lock().insert(control) {
            debug!(control = control.name(), "duplicate trigger ignored");
            return Err(ErrorKind::Busy(control.name().to_string()));
        }
        log_missing(self.view.set_control_busy(control, true));
        Ok(PendingGuard {
            controls: Arc::clone(self),
            control,
        })
    }

    pub fn is_pending(&self, control: Control) -> bool {
        self.lock().contains(&control)
    }

    fn release(&self, control: Control) {
        self.lock().remove(&control);
        log_missing(self.view.set_control_busy(control, false));
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Control>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[must_use = "the control is released as soon as the guard is dropped"]
pub struct PendingGuard {
    controls: Arc<PendingControls>,
    control: Control,
}

impl PendingGuard {
    pub fn control(&self) -> Control {
        self.control
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.controls.release(self.control);
    }
}

#[cfg(test)]
#[path = "tests/pending_tests.rs"]
mod tests;
