//! Resolving a street address to a grid location.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{Location, MAX_COORDINATE, MIN_COORDINATE};
use thiserror::Error;

/// Errors returned by a [`Geocoder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// The street was blank.
    #[error("Street is required")]
    StreetRequired,

    /// The geocoding service could not be reached.
    #[error("Geocoder unavailable: {0}")]
    Unavailable(String),
}

/// Port to the geocoding service.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves a street to a location on the grid.
    async fn locate(&self, street: &str) -> Result<Location, GeocodeError>;
}

/// In-memory geocoder.
///
/// Known streets map to fixed locations. Any other street resolves to a
/// location derived from its name, so the same street always lands on the
/// same cell.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeocoder {
    streets: Arc<HashMap<String, Location>>,
}

impl InMemoryGeocoder {
    /// Creates a geocoder with no known streets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this geocoder that also knows `street`.
    pub fn with_street(self, street: impl Into<String>, location: Location) -> Self {
        let mut streets = (*self.streets).clone();
        streets.insert(normalize(&street.into()), location);
        Self {
            streets: Arc::new(streets),
        }
    }

    fn derive(street: &str) -> Location {
        let hash = street
            .bytes()
            .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
        let span = (MAX_COORDINATE - MIN_COORDINATE + 1) as u32;
        let x = MIN_COORDINATE + (hash % span) as i32;
        let y = MIN_COORDINATE + ((hash / span) % span) as i32;
        Location::new(x, y).unwrap_or_else(|_| Location::min())
    }
}

fn normalize(street: &str) -> String {
    street.trim().to_lowercase()
}

#[async_trait]
impl Geocoder for InMemoryGeocoder {
    async fn locate(&self, street: &str) -> Result<Location, GeocodeError> {
        let street = normalize(street);
        if street.is_empty() {
            return Err(GeocodeError::StreetRequired);
        }

        Ok(self
            .streets
            .get(&street)
            .copied()
            .unwrap_or_else(|| Self::derive(&street)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_street_resolves_to_its_location() {
        let geocoder =
            InMemoryGeocoder::new().with_street("Test Street", Location::new(3, 3).unwrap());

        let location = geocoder.locate("  test street ").await.unwrap();

        assert_eq!(location, Location::new(3, 3).unwrap());
    }

    #[tokio::test]
    async fn unknown_street_resolves_deterministically_inside_grid() {
        let geocoder = InMemoryGeocoder::new();

        for street in ["Main", "Elm Street", "Nowhere Lane", "x"] {
            let first = geocoder.locate(street).await.unwrap();
            let second = geocoder.locate(street).await.unwrap();
            assert_eq!(first, second);
            assert!((MIN_COORDINATE..=MAX_COORDINATE).contains(&first.x()));
            assert!((MIN_COORDINATE..=MAX_COORDINATE).contains(&first.y()));
        }
    }

    #[tokio::test]
    async fn blank_street_is_rejected() {
        let geocoder = InMemoryGeocoder::new();
        assert_eq!(
            geocoder.locate("   ").await,
            Err(GeocodeError::StreetRequired)
        );
    }
}
