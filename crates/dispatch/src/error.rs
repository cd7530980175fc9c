//! Engine error types.

use domain::DomainError;
use store::StoreError;
use thiserror::Error;

use crate::geocoder::GeocodeError;
use crate::publisher::PublishError;

/// Errors that can occur while running intake or a tick batch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// The message bus could not be reached.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// The street could not be resolved to a location.
    #[error("Geocoding error: {0}")]
    Geocode(#[from] GeocodeError),
}

impl EngineError {
    /// Returns true if the error aborts a whole batch rather than one item.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            EngineError::Store(e) => e.is_infrastructure(),
            EngineError::Publish(e) => e.is_unavailable(),
            EngineError::Geocode(e) => matches!(e, GeocodeError::Unavailable(_)),
            EngineError::Domain(_) => false,
        }
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
