//! Order aggregate and related types.

mod aggregate;
mod state;

pub use aggregate::Order;
pub use state::OrderStatus;

use common::CourierId;
use thiserror::Error;

use crate::error::ErrorClass;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order ID is required.
    #[error("Order ID is required")]
    IdRequired,

    /// The order already has a courier.
    #[error("Order is already assigned to courier {courier_id}")]
    AlreadyAssigned { courier_id: CourierId },

    /// The order was delivered; no further transitions are possible.
    #[error("Order is already completed")]
    AlreadyCompleted,

    /// Only an assigned order can be completed.
    #[error("Cannot complete an order that is not assigned (current status: {status})")]
    NotAssigned { status: OrderStatus },
}

impl OrderError {
    pub(crate) fn class(&self) -> ErrorClass {
        match self {
            OrderError::IdRequired => ErrorClass::Validation,
            _ => ErrorClass::Conflict,
        }
    }
}
