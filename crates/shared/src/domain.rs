use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(RelayId, u32);
id_newtype!(CircuitSlot, u8);

/// Key prefix the backend expects for each slot in a manual error submission.
pub const SLOT_KEY_PREFIX: &str = "stromkreis";

impl CircuitSlot {
    pub fn wire_key(self) -> String {
        format!("{SLOT_KEY_PREFIX}{}", self.0)
    }
}

/// Opaque session token chosen by the operator (or printed on the exam sheet).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamNumber(pub String);

impl ExamNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExamNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A relay picked for one circuit slot, together with the label the operator saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayChoice {
    pub relay_id: RelayId,
    pub label: String,
}

impl RelayChoice {
    /// Relay id `0` stands for "no error" and yields `None`.
    pub fn new(relay_id: u32, label: impl Into<String>) -> Option<Self> {
        if relay_id == 0 {
            return None;
        }
        Some(Self {
            relay_id: RelayId(relay_id),
            label: label.into(),
        })
    }
}
