//! Advancing a courier toward its target, one tick at a time.

use thiserror::Error;

use crate::courier::Courier;
use crate::location::{Location, LocationError};

/// Errors returned by the movement algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MovementError {
    /// Movement produced an off-grid location. Indicates a bug, never a
    /// caller error.
    #[error("Movement invariant violated: {0}")]
    InvariantViolation(LocationError),
}

/// Result of moving a courier for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub from: Location,
    pub to: Location,
    /// The courier now stands on the target.
    pub arrived: bool,
}

/// Computes where a courier at `current` ends up after one tick.
///
/// X is resolved before Y. The courier covers at most `cruising_range`
/// Manhattan steps and never overshoots the target on either axis; range
/// left over after X is reached is spent on Y.
pub fn next_location(
    current: &Location,
    target: &Location,
    cruising_range: u32,
) -> Result<Location, MovementError> {
    let range = i32::try_from(cruising_range).unwrap_or(i32::MAX);

    let (x, used) = advance_axis(current.x(), target.x(), range);
    let y = if x == target.x() {
        advance_axis(current.y(), target.y(), range - used).0
    } else {
        current.y()
    };

    Location::new(x, y).map_err(MovementError::InvariantViolation)
}

/// Moves `courier` one tick toward `target` at the speed of its transport.
///
/// Arrival is only reported; completing the order and releasing the
/// courier is up to the caller.
pub fn move_courier(
    courier: &mut Courier,
    target: &Location,
) -> Result<MoveOutcome, MovementError> {
    let from = courier.location();
    let to = next_location(&from, target, courier.transport().speed())?;
    courier.relocate(to);

    Ok(MoveOutcome {
        from,
        to,
        arrived: to == *target,
    })
}

/// Returns the new coordinate and the number of steps spent.
fn advance_axis(from: i32, to: i32, range: i32) -> (i32, i32) {
    let delta = to - from;
    let step = delta.abs().min(range.max(0));
    (from + step * delta.signum(), step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courier::Transport;

    fn location(x: i32, y: i32) -> Location {
        Location::new(x, y).unwrap()
    }

    fn courier_at(transport: Transport, x: i32, y: i32) -> Courier {
        Courier::create("Ivan", transport, location(x, y)).unwrap()
    }

    #[test]
    fn pedestrian_moves_one_step_along_x_first() {
        let mut courier = courier_at(Transport::Pedestrian, 1, 1);
        let outcome = move_courier(&mut courier, &location(5, 10)).unwrap();

        assert_eq!(outcome.from, location(1, 1));
        assert_eq!(outcome.to, location(2, 1));
        assert!(!outcome.arrived);
        assert_eq!(courier.location(), location(2, 1));
    }

    #[test]
    fn pedestrian_arrives_after_exactly_distance_ticks() {
        let target = location(5, 10);
        let mut courier = courier_at(Transport::Pedestrian, 1, 1);

        let mut ticks = 0;
        loop {
            let before = courier.location().distance_to(&target);
            let outcome = move_courier(&mut courier, &target).unwrap();
            ticks += 1;

            assert_eq!(before - courier.location().distance_to(&target), 1);
            if outcome.arrived {
                break;
            }
            assert!(ticks < 13);
        }

        assert_eq!(ticks, 13);
        assert_eq!(courier.location(), target);
    }

    #[test]
    fn leftover_range_spills_into_y() {
        // dx = 1, car speed 3: one step on X, two on Y
        let next = next_location(&location(4, 1), &location(5, 9), 3).unwrap();
        assert_eq!(next, location(5, 3));
    }

    #[test]
    fn exhausted_range_leaves_y_untouched() {
        let next = next_location(&location(1, 1), &location(8, 9), 3).unwrap();
        assert_eq!(next, location(4, 1));
    }

    #[test]
    fn moves_toward_lower_coordinates() {
        let next = next_location(&location(10, 10), &location(9, 2), 3).unwrap();
        assert_eq!(next, location(9, 8));
    }

    #[test]
    fn never_overshoots_the_target() {
        let target = location(3, 2);
        let next = next_location(&location(2, 1), &target, 3).unwrap();
        assert_eq!(next, target);
    }

    #[test]
    fn standing_on_the_target_is_a_no_op() {
        let mut courier = courier_at(Transport::Car, 6, 6);
        let outcome = move_courier(&mut courier, &location(6, 6)).unwrap();

        assert_eq!(outcome.from, outcome.to);
        assert!(outcome.arrived);
    }

    #[test]
    fn every_tick_stays_on_the_grid_and_within_speed() {
        for transport in Transport::all() {
            for (sx, sy, tx, ty) in [
                (1, 1, 10, 10),
                (10, 10, 1, 1),
                (1, 10, 10, 1),
                (7, 3, 2, 9),
            ] {
                let target = location(tx, ty);
                let mut courier = courier_at(*transport, sx, sy);
                for _ in 0..20 {
                    let before = courier.location();
                    let outcome = move_courier(&mut courier, &target).unwrap();
                    assert!(before.distance_to(&outcome.to) <= transport.speed());
                    assert!(outcome.to.distance_to(&target) <= before.distance_to(&target));
                    if outcome.arrived {
                        break;
                    }
                }
                assert_eq!(courier.location(), target);
            }
        }
    }
}
