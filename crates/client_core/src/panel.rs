use std::{collections::BTreeMap, fmt};

use shared::{
    domain::{CircuitSlot, RelayChoice, RelayId},
    error::ErrorKind,
    protocol::{ManualErrorsRequest, ManualErrorsResponse, ResetRelaysResponse},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    request::Endpoint,
    view::{log_missing, Control},
    UiContext,
};

pub const NO_ERROR_DESCRIPTION: &str = "No error selected";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub slot: CircuitSlot,
    pub label: String,
    pub relay_id: RelayId,
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Circuit {}: {} (relay {})",
            self.slot, self.label, self.relay_id
        )
    }
}

/// Derived view of the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSummary {
    NoneActive,
    Active(Vec<SummaryLine>),
}

impl SelectionSummary {
    pub fn active_count(&self) -> usize {
        match self {
            Self::NoneActive => 0,
            Self::Active(lines) => lines.len(),
        }
    }
}

impl fmt::Display for SelectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoneActive => f.write_str("No errors active"),
            Self::Active(lines) => {
                write!(f, "{} errors selected:", lines.len())?;
                for line in lines {
                    write!(f, "\n• {line}")?;
                }
                Ok(())
            }
        }
    }
}

/// Outcome of a successful manual error submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub activated_count: usize,
    pub active_relays: Vec<RelayId>,
    pub failed_relays: Vec<RelayId>,
}

/// Manual fault injection: one relay (or none) per circuit slot.
pub struct ManualErrorPanel {
    ctx: UiContext,
    selection: Mutex<BTreeMap<CircuitSlot, Option<RelayChoice>>>,
}

impl ManualErrorPanel {
    pub fn new(ctx: UiContext) -> Self {
        let selection = (1..=ctx.settings.circuit_count)
            .map(|slot| (CircuitSlot(slot), None))
            .collect();
        Self {
            ctx,
            selection: Mutex::new(selection),
        }
    }

    pub async fn set_selection(
        &self,
        slot: CircuitSlot,
        choice: Option<RelayChoice>,
    ) -> Result<(), ErrorKind> {
        let summary = {
            let mut selection = self.selection.lock().await;
            let entry = selection
                .get_mut(&slot)
                .ok_or(ErrorKind::UnknownSlot(slot.0))?;
            log_missing(
                self.ctx
                    .view
                    .render_slot_description(slot, choice.as_ref().map(|c| c.label.as_str())),
            );
            *entry = choice;
            summarize(&selection)
        };
        log_missing(self.ctx.view.render_selection_summary(&summary));
        Ok(())
    }

    pub async fn selection(&self) -> BTreeMap<CircuitSlot, Option<RelayChoice>> {
        self.selection.lock().await.clone()
    }

    pub async fn summary(&self) -> SelectionSummary {
        summarize(&*self.selection.lock().await)
    }

    /// Re-renders the summary from the current selection.
    pub async fn refresh(&self) {
        let summary = self.summary().await;
        log_missing(self.ctx.view.render_selection_summary(&summary));
    }

    pub async fn submit(&self) -> Result<ActivationReport, ErrorKind> {
        let errors: BTreeMap<String, RelayId> = self
            .selection
            .lock()
            .await
            .iter()
            .filter_map(|(slot, choice)| {
                choice
                    .as_ref()
                    .map(|choice| (slot.wire_key(), choice.relay_id))
            })
            .collect();

        let view = &self.ctx.view;
        if errors.is_empty() {
            view.alert("⚠ No errors selected!");
            return Err(ErrorKind::Empty("no circuit has an error selected".into()));
        }

        let _pending = self.ctx.pending.acquire(Control::SubmitErrors)?;
        let request = ManualErrorsRequest { errors };
        view.debug_log(&format!(
            "Setting {} manual errors: {}",
            request.errors.len(),
            serde_json::to_string(&request.errors).unwrap_or_default()
        ));

        let result = self
            .ctx
            .actions
            .perform_json::<ManualErrorsResponse, _>(Endpoint::SetManualErrors, &request)
            .await;
        match result {
            Ok(response) => {
                view.debug_log(&format!(
                    "Response: {} activated, relays {:?}",
                    response.activated_count, response.active_relays
                ));
                info!(
                    activated = response.activated_count,
                    failed = response.failed_relays.len(),
                    "manual errors applied"
                );
                view.alert(&format!(
                    "✅ {} errors activated!\nActive relays: {}",
                    response.activated_count,
                    join_relays(&response.active_relays)
                ));
                self.refresh().await;
                Ok(ActivationReport {
                    activated_count: response.activated_count,
                    active_relays: response.active_relays,
                    failed_relays: response.failed_relays,
                })
            }
            Err(err) => {
                view.debug_log(&format!("Error: {err}"));
                match &err {
                    ErrorKind::Rejected(reason) => {
                        view.alert(&format!("❌ Failed to activate errors: {reason}"))
                    }
                    other if other.is_connection_failure() => {
                        view.alert(&format!("🚫 Connection error: {other}"))
                    }
                    other => view.alert(&other.to_string()),
                }
                Err(err)
            }
        }
    }

    /// Confirms, resets relays on the server, then clears the local selection
    /// whatever the server said.
    pub async fn reset(&self) -> Result<(), ErrorKind> {
        let view = &self.ctx.view;
        if !view
            .confirm("🔄 Reset all relays?\n\nThis deactivates every active error.")
            .await
        {
            return Err(ErrorKind::Declined);
        }

        let _pending = self.ctx.pending.acquire(Control::ResetRelays)?;
        view.debug_log("Resetting relays...");
        let result = self
            .ctx
            .actions
            .perform::<ResetRelaysResponse>(Endpoint::ResetRelays)
            .await;

        {
            let mut selection = self.selection.lock().await;
            for (slot, choice) in selection.iter_mut() {
                *choice = None;
                log_missing(view.render_slot_description(*slot, None));
            }
        }
        self.refresh().await;

        match result {
            Ok(response) => {
                view.debug_log(&format!(
                    "Reset response: {} relays still active",
                    response.active_relays.len()
                ));
                view.alert("✅ All relays reset!");
                Ok(())
            }
            Err(ErrorKind::Rejected(reason)) => {
                warn!(%reason, "relay reset only partially succeeded");
                view.debug_log(&format!("Reset rejected: {reason}"));
                view.alert(&format!("⚠ Reset partially successful: {reason}"));
                Err(ErrorKind::Rejected(reason))
            }
            Err(err) => {
                view.debug_log(&format!("Reset error: {err}"));
                view.alert("🚫 Connection error during reset!");
                Err(err)
            }
        }
    }
}

fn summarize(selection: &BTreeMap<CircuitSlot, Option<RelayChoice>>) -> SelectionSummary {
    let lines: Vec<SummaryLine> = selection
        .iter()
        .filter_map(|(slot, choice)| {
            choice.as_ref().map(|choice| SummaryLine {
                slot: *slot,
                label: choice.label.clone(),
                relay_id: choice.relay_id,
            })
        })
        .collect();
    if lines.is_empty() {
        SelectionSummary::NoneActive
    } else {
        SelectionSummary::Active(lines)
    }
}

fn join_relays(relays: &[RelayId]) -> String {
    relays
        .iter()
        .map(RelayId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "tests/panel_tests.rs"]
mod tests;
