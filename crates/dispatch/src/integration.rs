//! Events as seen by consumers outside this service.

use domain::{DeliveryEvent, OrderStatus};
use serde::{Deserialize, Serialize};

/// Wire event published for every order status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusChanged {
    pub order_id: String,
    pub order_status: OrderStatus,
}

impl OrderStatusChanged {
    /// Serializes the event as a JSON message body.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl From<&DeliveryEvent> for OrderStatusChanged {
    fn from(event: &DeliveryEvent) -> Self {
        let order_status = match event {
            DeliveryEvent::OrderAssigned(_) => OrderStatus::Assigned,
            DeliveryEvent::OrderCompleted(_) => OrderStatus::Completed,
        };
        Self {
            order_id: event.order_id().to_string(),
            order_status,
        }
    }
}
