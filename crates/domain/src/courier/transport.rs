//! Transport catalog.

use thiserror::Error;

/// Errors raised by transport lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Unknown transport id {0}; expected one of 1 (pedestrian), 2 (bicycle), 3 (car)")]
    UnknownId(i32),

    #[error("Unknown transport '{0}'; expected one of pedestrian, bicycle, car")]
    UnknownName(String),
}

/// How a courier travels. Fixed catalog; the speed is the number of grid
/// steps a courier covers per movement tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Pedestrian,
    Bicycle,
    Car,
}

const CATALOG: [Transport; 3] = [Transport::Pedestrian, Transport::Bicycle, Transport::Car];

impl Transport {
    /// Every transport in id order.
    pub fn all() -> &'static [Transport] {
        &CATALOG
    }

    /// Looks a transport up by its stable numeric id.
    pub fn from_id(id: i32) -> Result<Self, TransportError> {
        CATALOG
            .iter()
            .copied()
            .find(|t| t.id() == id)
            .ok_or(TransportError::UnknownId(id))
    }

    /// Looks a transport up by name, ignoring case.
    pub fn from_name(name: &str) -> Result<Self, TransportError> {
        CATALOG
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| TransportError::UnknownName(name.to_string()))
    }

    /// Stable numeric id.
    pub fn id(&self) -> i32 {
        match self {
            Transport::Pedestrian => 1,
            Transport::Bicycle => 2,
            Transport::Car => 3,
        }
    }

    /// Lowercase display name.
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Pedestrian => "pedestrian",
            Transport::Bicycle => "bicycle",
            Transport::Car => "car",
        }
    }

    /// Grid steps per tick.
    pub fn speed(&self) -> u32 {
        match self {
            Transport::Pedestrian => 1,
            Transport::Bicycle => 2,
            Transport::Car => 3,
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
