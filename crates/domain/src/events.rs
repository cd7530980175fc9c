//! Delivery domain events.

use chrono::{DateTime, Utc};
use common::{CourierId, EventId, OrderId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events raised by delivery aggregates.
///
/// Serialized with an explicit `type` tag so an outbox row can be turned
/// back into the concrete variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DeliveryEvent {
    /// An order was assigned to a courier.
    OrderAssigned(OrderAssignedData),

    /// A courier delivered an order.
    OrderCompleted(OrderCompletedData),
}

impl DomainEvent for DeliveryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DeliveryEvent::OrderAssigned(_) => "OrderAssigned",
            DeliveryEvent::OrderCompleted(_) => "OrderCompleted",
        }
    }

    fn event_id(&self) -> EventId {
        match self {
            DeliveryEvent::OrderAssigned(data) => data.event_id,
            DeliveryEvent::OrderCompleted(data) => data.event_id,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DeliveryEvent::OrderAssigned(data) => data.occurred_at,
            DeliveryEvent::OrderCompleted(data) => data.occurred_at,
        }
    }
}

impl DeliveryEvent {
    /// Creates an OrderAssigned event.
    pub fn order_assigned(order_id: OrderId, courier_id: CourierId) -> Self {
        DeliveryEvent::OrderAssigned(OrderAssignedData {
            event_id: EventId::new(),
            order_id,
            courier_id,
            occurred_at: Utc::now(),
        })
    }

    /// Creates an OrderCompleted event.
    pub fn order_completed(order_id: OrderId, courier_id: CourierId) -> Self {
        DeliveryEvent::OrderCompleted(OrderCompletedData {
            event_id: EventId::new(),
            order_id,
            courier_id,
            occurred_at: Utc::now(),
        })
    }

    /// Returns the order the event is about.
    pub fn order_id(&self) -> &OrderId {
        match self {
            DeliveryEvent::OrderAssigned(data) => &data.order_id,
            DeliveryEvent::OrderCompleted(data) => &data.order_id,
        }
    }
}

/// Data for OrderAssigned event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAssignedData {
    pub event_id: EventId,
    pub order_id: OrderId,
    /// The courier now carrying the order.
    pub courier_id: CourierId,
    pub occurred_at: DateTime<Utc>,
}

/// Data for OrderCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCompletedData {
    pub event_id: EventId,
    pub order_id: OrderId,
    /// The courier that delivered the order.
    pub courier_id: CourierId,
    pub occurred_at: DateTime<Utc>,
}
