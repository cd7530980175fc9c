//! Application layer of the delivery dispatch system.
//!
//! Drives the domain on three independent schedules:
//! 1. Assign created orders to the best free courier
//! 2. Move busy couriers one tick toward their orders
//! 3. Relay captured outbox events to the message bus
//!
//! Also provides order intake, courier registration and the read side.

pub mod assign;
pub mod driver;
pub mod error;
pub mod geocoder;
pub mod intake;
pub mod integration;
pub mod movement;
pub mod publisher;
pub mod queries;
pub mod relay;

pub use assign::{AssignReport, assign_orders};
pub use driver::{TickDriver, TickSchedule, Trigger};
pub use error::{EngineError, Result};
pub use geocoder::{GeocodeError, Geocoder, InMemoryGeocoder};
pub use intake::{OrderCreation, OrderIntake};
pub use integration::OrderStatusChanged;
pub use movement::{MoveReport, move_couriers};
pub use publisher::{
    EventPublisher, InMemoryEventBus, LoggingPublisher, PublishError, PublishedMessage,
};
pub use queries::{CourierView, LocationView, OrderView, list_active_orders, list_couriers};
pub use relay::{OutboxRelay, RelayConfig, RelayReport};
