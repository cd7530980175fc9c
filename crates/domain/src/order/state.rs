//! Order lifecycle.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Created ──assign_courier──► Assigned ──complete──► Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Waiting for a courier.
    #[default]
    Created,

    /// A courier is on the way.
    Assigned,

    /// Delivered (terminal state).
    Completed,
}

impl OrderStatus {
    /// Returns true if a courier can be assigned in this status.
    pub fn can_assign(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if the order can be completed in this status.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderStatus::Assigned)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    /// Returns the persisted name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Completed => "completed",
        }
    }

    /// Parses a persisted status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(OrderStatus::Created),
            "assigned" => Some(OrderStatus::Assigned),
            "completed" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_created() {
        assert_eq!(OrderStatus::default(), OrderStatus::Created);
    }

    #[test]
    fn test_transitions() {
        assert!(OrderStatus::Created.can_assign());
        assert!(!OrderStatus::Assigned.can_assign());
        assert!(!OrderStatus::Completed.can_assign());

        assert!(!OrderStatus::Created.can_complete());
        assert!(OrderStatus::Assigned.can_complete());
        assert!(!OrderStatus::Completed.can_complete());
    }

    #[test]
    fn test_only_completed_is_terminal() {
        assert!(!OrderStatus::Created.is_terminal());
        assert!(!OrderStatus::Assigned.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
    }

    #[test]
    fn test_serialization_uses_lowercase_names() {
        let json = serde_json::to_string(&OrderStatus::Assigned).unwrap();
        assert_eq!(json, "\"assigned\"");
        assert_eq!(OrderStatus::parse("assigned"), Some(OrderStatus::Assigned));
    }
}
