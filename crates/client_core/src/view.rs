//! View-binding layer: everything the controllers need from a front end.

use async_trait::async_trait;
use shared::{domain::CircuitSlot, error::ErrorKind};
use thiserror::Error;
use tracing::debug;

use crate::{panel::SelectionSummary, session::CompletionSummary};

/// A triggering control (button) that can have one request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    StartExam,
    FinishExam,
    RunTest,
    SubmitErrors,
    ResetRelays,
    AdminLogin,
    ClearDatabase,
    ConnectWifi,
    ShutdownSystem,
}

impl Control {
    pub fn name(self) -> &'static str {
        match self {
            Self::StartExam => "start_exam",
            Self::FinishExam => "finish_exam",
            Self::RunTest => "run_test",
            Self::SubmitErrors => "submit_errors",
            Self::ResetRelays => "reset_relays",
            Self::AdminLogin => "admin_login",
            Self::ClearDatabase => "clear_database",
            Self::ConnectWifi => "connect_wifi",
            Self::ShutdownSystem => "shutdown_system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    AdminCode,
    WifiSsid,
    WifiPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub id: MessageId,
    pub kind: StatusKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("view target `{0}` is not present")]
pub struct MissingTarget(pub &'static str);

impl From<MissingTarget> for ErrorKind {
    fn from(value: MissingTarget) -> Self {
        ErrorKind::MissingTarget(value.0.to_string())
    }
}

pub type Render = Result<(), MissingTarget>;

/// Front-end surface driven by the controllers.
///
/// Render methods report a missing target instead of failing; callers log
/// it and carry on.
#[async_trait]
pub trait View: Send + Sync {
    fn show_message(&self, message: &StatusMessage) -> Render;
    fn dismiss_message(&self, id: MessageId) -> Render;
    /// Blocking notification the operator has to acknowledge.
    fn alert(&self, text: &str);
    /// Yes/no prompt guarding destructive actions.
    async fn confirm(&self, question: &str) -> bool;

    fn set_control_visible(&self, control: Control, visible: bool) -> Render;
    fn set_control_busy(&self, control: Control, busy: bool) -> Render;
    fn clear_input(&self, field: InputField) -> Render;

    fn set_timer_visible(&self, visible: bool) -> Render;
    fn render_timer(&self, text: &str) -> Render;
    fn render_completion(&self, summary: &CompletionSummary) -> Render;
    fn render_redirect_countdown(&self, seconds_left: u32) -> Render;

    fn render_slot_description(&self, slot: CircuitSlot, description: Option<&str>) -> Render;
    fn render_selection_summary(&self, summary: &SelectionSummary) -> Render;

    fn render_shutdown_notice(&self) -> Render;
    fn debug_log(&self, line: &str);

    fn navigate(&self, path: &str);
    fn reload(&self);
}

pub(crate) fn log_missing(result: Render) {
    if let Err(missing) = result {
        let error = ErrorKind::from(missing);
        debug!(%error, "render skipped");
    }
}
