//! Order aggregate implementation.

use common::{CourierId, OrderId, Version};

use crate::aggregate::Aggregate;
use crate::events::DeliveryEvent;
use crate::location::Location;

use super::{OrderError, OrderStatus};

/// Order aggregate root.
///
/// An order is created when an upstream basket is confirmed, receives a
/// courier from dispatch and is completed when that courier arrives.
/// Completed orders are never deleted.
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    location: Location,
    status: OrderStatus,
    courier_id: Option<CourierId>,
    version: Version,
    events: Vec<DeliveryEvent>,
}

impl Aggregate for Order {
    type Event = DeliveryEvent;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn aggregate_id(&self) -> String {
        self.id.to_string()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn pending_events(&self) -> &[DeliveryEvent] {
        &self.events
    }

    fn take_events(&mut self) -> Vec<DeliveryEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Order {
    /// Creates a new order in Created status.
    pub fn new(id: OrderId, location: Location) -> Self {
        Self {
            id,
            location,
            status: OrderStatus::Created,
            courier_id: None,
            version: Version::initial(),
            events: Vec::new(),
        }
    }

    /// Creates a new order from a raw caller-supplied id.
    pub fn create(id: impl Into<String>, location: Location) -> Result<Self, OrderError> {
        let id = OrderId::new(id).map_err(|_| OrderError::IdRequired)?;
        Ok(Self::new(id, location))
    }

    /// Rebuilds an order from persisted state.
    pub fn restore(
        id: OrderId,
        location: Location,
        status: OrderStatus,
        courier_id: Option<CourierId>,
        version: Version,
    ) -> Self {
        Self {
            id,
            location,
            status,
            courier_id,
            version,
            events: Vec::new(),
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// Delivery target.
    pub fn location(&self) -> Location {
        self.location
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// The assigned courier; present iff the status is not Created.
    pub fn courier_id(&self) -> Option<CourierId> {
        self.courier_id
    }
}

// Command methods
impl Order {
    /// Assigns a courier and raises `OrderAssigned`.
    pub fn assign_courier(&mut self, courier_id: CourierId) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Completed => return Err(OrderError::AlreadyCompleted),
            OrderStatus::Assigned => {
                return Err(OrderError::AlreadyAssigned {
                    courier_id: self.courier_id.unwrap_or(courier_id),
                });
            }
            OrderStatus::Created => {}
        }

        self.status = OrderStatus::Assigned;
        self.courier_id = Some(courier_id);
        self.events
            .push(DeliveryEvent::order_assigned(self.id.clone(), courier_id));
        Ok(())
    }

    /// Marks the order delivered and raises `OrderCompleted`.
    pub fn complete(&mut self) -> Result<(), OrderError> {
        let courier_id = match (self.status, self.courier_id) {
            (OrderStatus::Assigned, Some(courier_id)) => courier_id,
            _ => {
                return Err(OrderError::NotAssigned {
                    status: self.status,
                });
            }
        };

        self.status = OrderStatus::Completed;
        self.events
            .push(DeliveryEvent::order_completed(self.id.clone(), courier_id));
        Ok(())
    }
}
