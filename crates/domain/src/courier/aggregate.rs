//! Courier aggregate implementation.

use common::{CourierId, Version};

use crate::aggregate::Aggregate;
use crate::events::DeliveryEvent;
use crate::location::Location;

use super::{CourierError, CourierStatus, Transport};

/// Courier aggregate root.
///
/// A courier is created Free at a location, becomes Busy when dispatch
/// assigns it an order, moves one tick at a time toward the order, and is
/// released back to Free once the order is delivered.
///
/// Couriers raise no domain events; only order transitions reach the
/// outbox.
#[derive(Debug, Clone)]
pub struct Courier {
    id: CourierId,
    name: String,
    transport: Transport,
    location: Location,
    status: CourierStatus,
    version: Version,
}

impl Aggregate for Courier {
    type Event = DeliveryEvent;

    fn aggregate_type() -> &'static str {
        "Courier"
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
}

impl Courier {
    /// Creates a new Free courier.
    pub fn create(
        name: impl Into<String>,
        transport: Transport,
        location: Location,
    ) -> Result<Self, CourierError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CourierError::NameRequired);
        }

        Ok(Self {
            id: CourierId::new(),
            name,
            transport,
            location,
            status: CourierStatus::Free,
            version: Version::initial(),
        })
    }

    /// Rebuilds a courier from persisted state.
    pub fn restore(
        id: CourierId,
        name: String,
        transport: Transport,
        location: Location,
        status: CourierStatus,
        version: Version,
    ) -> Self {
        Self {
            id,
            name,
            transport,
            location,
            status,
            version,
        }
    }
}

// Query methods
impl Courier {
    pub fn id(&self) -> CourierId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn status(&self) -> CourierStatus {
        self.status
    }

    /// Returns true if the courier can be dispatched.
    pub fn is_free(&self) -> bool {
        self.status == CourierStatus::Free
    }

    /// Number of ticks needed to reach `target`, truncated.
    pub fn steps_to(&self, target: &Location) -> u32 {
        self.location.distance_to(target) / self.transport.speed()
    }
}

// Command methods
impl Courier {
    /// Marks the courier as carrying an order.
    pub fn set_busy(&mut self) -> Result<(), CourierError> {
        if self.status == CourierStatus::Busy {
            return Err(CourierError::AlreadyBusy);
        }

        self.status = CourierStatus::Busy;
        Ok(())
    }

    /// Releases the courier after delivery.
    pub fn set_free(&mut self) -> Result<(), CourierError> {
        if self.status != CourierStatus::Busy {
            return Err(CourierError::NotBusy);
        }

        self.status = CourierStatus::Free;
        Ok(())
    }

    pub(crate) fn relocate(&mut self, location: Location) {
        self.location = location;
    }
}
