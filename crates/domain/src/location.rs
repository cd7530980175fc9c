//! Grid coordinates shared by couriers and orders.

use thiserror::Error;

/// Smallest valid coordinate on either axis.
pub const MIN_COORDINATE: i32 = 1;

/// Largest valid coordinate on either axis.
pub const MAX_COORDINATE: i32 = 10;

/// A grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

/// Errors raised when building a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    /// A coordinate fell outside `[MIN_COORDINATE, MAX_COORDINATE]`.
    #[error("{axis} coordinate {value} is out of range [1, 10]")]
    OutOfRange { axis: Axis, value: i32 },
}

/// An immutable point on the delivery grid.
///
/// Two locations are equal iff both coordinates match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    x: i32,
    y: i32,
}

impl Location {
    /// Creates a location, validating both coordinates.
    pub fn new(x: i32, y: i32) -> Result<Self, LocationError> {
        check(Axis::X, x)?;
        check(Axis::Y, y)?;
        Ok(Self { x, y })
    }

    /// Returns the minimal corner of the grid.
    pub fn min() -> Self {
        Self {
            x: MIN_COORDINATE,
            y: MIN_COORDINATE,
        }
    }

    /// Returns the maximal corner of the grid.
    pub fn max() -> Self {
        Self {
            x: MAX_COORDINATE,
            y: MAX_COORDINATE,
        }
    }

    /// Horizontal coordinate.
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate.
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Manhattan distance to another location.
    pub fn distance_to(&self, other: &Location) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

fn check(axis: Axis, value: i32) -> Result<(), LocationError> {
    if (MIN_COORDINATE..=MAX_COORDINATE).contains(&value) {
        Ok(())
    } else {
        Err(LocationError::OutOfRange { axis, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_coordinate_on_the_grid() {
        for x in MIN_COORDINATE..=MAX_COORDINATE {
            for y in MIN_COORDINATE..=MAX_COORDINATE {
                let location = Location::new(x, y).unwrap();
                assert_eq!(location.x(), x);
                assert_eq!(location.y(), y);
            }
        }
    }

    #[test]
    fn rejects_coordinates_outside_the_grid() {
        for bad in [0, 11, -1, -10, i32::MIN, i32::MAX] {
            assert_eq!(
                Location::new(bad, 5),
                Err(LocationError::OutOfRange {
                    axis: Axis::X,
                    value: bad
                })
            );
            assert_eq!(
                Location::new(5, bad),
                Err(LocationError::OutOfRange {
                    axis: Axis::Y,
                    value: bad
                })
            );
        }
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(Location::new(3, 4).unwrap(), Location::new(3, 4).unwrap());
        assert_ne!(Location::new(3, 4).unwrap(), Location::new(4, 3).unwrap());
    }

    #[test]
    fn distance_is_manhattan() {
        let a = Location::new(5, 5).unwrap();
        assert_eq!(a.distance_to(&a), 0);

        let from = Location::new(1, 1).unwrap();
        let to = Location::new(5, 10).unwrap();
        assert_eq!(from.distance_to(&to), 13);
        assert_eq!(to.distance_to(&from), 13);
    }

    #[test]
    fn corners_are_valid() {
        assert_eq!(Location::min(), Location::new(1, 1).unwrap());
        assert_eq!(Location::max(), Location::new(10, 10).unwrap());
    }
}
