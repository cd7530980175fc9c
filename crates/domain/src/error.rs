//! Domain error types.

use thiserror::Error;

use crate::courier::{CourierError, TransportError};
use crate::location::LocationError;
use crate::order::OrderError;
use crate::services::dispatch::DispatchError;
use crate::services::movement::MovementError;

/// How a caller should treat a domain failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input caught at construction; nothing was mutated.
    Validation,
    /// A legitimate business conflict; skip the item, it is re-evaluated later.
    Conflict,
    /// A logic bug; fatal to the item and logged loudly.
    Invariant,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A coordinate was outside the grid.
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    /// An unknown transport was requested.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An error occurred in the courier aggregate.
    #[error("Courier error: {0}")]
    Courier(#[from] CourierError),

    /// An error occurred in the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Dispatching an order failed.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Moving a courier failed.
    #[error("Movement error: {0}")]
    Movement(#[from] MovementError),
}

impl DomainError {
    /// Classifies the error for skip/log decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            DomainError::Location(_) | DomainError::Transport(_) => ErrorClass::Validation,
            DomainError::Courier(e) => e.class(),
            DomainError::Order(e) => e.class(),
            DomainError::Dispatch(e) => e.class(),
            DomainError::Movement(_) => ErrorClass::Invariant,
        }
    }
}
