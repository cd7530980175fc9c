//! Courier aggregate and related types.

mod aggregate;
mod status;
mod transport;

pub use aggregate::Courier;
pub use status::CourierStatus;
pub use transport::{Transport, TransportError};

use thiserror::Error;

use crate::error::ErrorClass;

/// Errors that can occur during courier operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CourierError {
    /// Courier name is required.
    #[error("Courier name is required")]
    NameRequired,

    /// The courier is already carrying an order.
    #[error("Courier is already busy")]
    AlreadyBusy,

    /// Only a busy courier can be released.
    #[error("Courier is not busy")]
    NotBusy,
}

impl CourierError {
    pub(crate) fn class(&self) -> ErrorClass {
        match self {
            CourierError::NameRequired => ErrorClass::Validation,
            CourierError::AlreadyBusy | CourierError::NotBusy => ErrorClass::Conflict,
        }
    }
}
