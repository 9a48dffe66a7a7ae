use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy for every client-side action.
///
/// Network-facing variants (`Transport`, `Network`, `Rejected`) come out of a
/// single round trip. The rest are local: no request was issued.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("server responded with HTTP status {status}")]
    Transport { status: u16 },
    #[error("network failure: {0}")]
    Network(String),
    #[error("rejected by server: {0}")]
    Rejected(String),
    #[error("nothing to submit: {0}")]
    Empty(String),
    #[error("view target `{0}` is not present")]
    MissingTarget(String),
    #[error("confirmation declined")]
    Declined,
    #[error("`{0}` is already in progress")]
    Busy(String),
    #[error("no exam session is running")]
    NoActiveSession,
    #[error("circuit slot {0} is out of range")]
    UnknownSlot(u8),
}

impl ErrorKind {
    /// True for failures of the round trip itself rather than a server verdict.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Network(_))
    }
}
