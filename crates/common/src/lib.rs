//! Strongly typed identifiers shared by every layer of the delivery system.

mod types;

pub use types::{CourierId, EventId, OrderId, OrderIdError, Version};
