//! Courier availability.

use serde::{Deserialize, Serialize};

/// Whether a courier can take a new order.
///
/// State transitions:
/// ```text
/// Free ──set_busy──► Busy ──set_free──► Free
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourierStatus {
    /// Available for dispatch.
    #[default]
    Free,

    /// Carrying an order.
    Busy,
}

impl CourierStatus {
    /// Returns the persisted name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CourierStatus::Free => "free",
            CourierStatus::Busy => "busy",
        }
    }

    /// Parses a persisted status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(CourierStatus::Free),
            "busy" => Some(CourierStatus::Busy),
            _ => None,
        }
    }
}

impl std::fmt::Display for CourierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
