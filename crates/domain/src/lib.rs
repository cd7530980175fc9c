//! Domain layer for the delivery dispatch system.
//!
//! This crate provides the core domain model:
//! - [`Location`] value object on a bounded grid with Manhattan distance
//! - [`Transport`] catalog and the [`Courier`] aggregate
//! - [`Order`] aggregate with its Created → Assigned → Completed lifecycle
//! - [`DeliveryEvent`] raised by aggregates on successful transitions
//! - The dispatch and movement algorithms in [`services`]
//!
//! Everything here is synchronous and free of I/O; persistence and
//! scheduling live in the `store` and `dispatch` crates.

pub mod aggregate;
pub mod courier;
pub mod error;
pub mod events;
pub mod location;
pub mod order;
pub mod services;

pub use aggregate::{Aggregate, DomainEvent};
pub use courier::{Courier, CourierError, CourierStatus, Transport, TransportError};
pub use error::{DomainError, ErrorClass};
pub use events::{DeliveryEvent, OrderAssignedData, OrderCompletedData};
pub use location::{Axis, Location, LocationError, MAX_COORDINATE, MIN_COORDINATE};
pub use order::{Order, OrderError, OrderStatus};
pub use services::dispatch::{DispatchError, dispatch};
pub use services::movement::{MoveOutcome, MovementError, move_courier, next_location};
