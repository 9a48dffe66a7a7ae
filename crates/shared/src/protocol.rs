use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ExamNumber, RelayId};

/// Fields every backend response carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionEnvelope {
    pub fn rejection_reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// Response body of actions that return nothing beyond the envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Acknowledged {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartExamRequest {
    pub exam_number: ExamNumber,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartExamResponse {
    #[serde(default)]
    pub selected_errors: Vec<RelayId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_number: Option<ExamNumber>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishExamRequest {
    pub exam_number: ExamNumber,
    /// Elapsed wall-clock seconds since the session was started.
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualErrorsRequest {
    /// Keyed by `CircuitSlot::wire_key`.
    pub errors: BTreeMap<String, RelayId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualErrorsResponse {
    #[serde(default)]
    pub activated_count: usize,
    #[serde(default)]
    pub active_relays: Vec<RelayId>,
    #[serde(default)]
    pub failed_relays: Vec<RelayId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetRelaysResponse {
    #[serde(default)]
    pub active_relays: Vec<RelayId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayStatusResponse {
    /// Relay number (as the backend stringifies it) to energized state.
    #[serde(default)]
    pub relays: BTreeMap<String, bool>,
    #[serde(default)]
    pub active_count: usize,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub active_relays: Vec<RelayId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiConnectRequest {
    pub ssid: String,
    pub password: String,
}
