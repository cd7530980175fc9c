//! Matching a created order to the best free courier.

use thiserror::Error;

use crate::courier::{Courier, CourierError};
use crate::error::ErrorClass;
use crate::order::{Order, OrderError, OrderStatus};

/// Errors returned by [`dispatch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Only orders in Created status can be dispatched.
    #[error("Cannot dispatch an order in {status} status")]
    InvalidState { status: OrderStatus },

    /// The courier set was empty.
    #[error("No couriers were supplied")]
    EmptyCourierSet,

    /// No supplied courier is free.
    #[error("No suitable courier was found")]
    NoSuitableCourier,

    /// The order rejected the assignment.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The chosen courier rejected the assignment.
    #[error(transparent)]
    Courier(#[from] CourierError),
}

impl DispatchError {
    pub(crate) fn class(&self) -> ErrorClass {
        match self {
            DispatchError::Order(e) => e.class(),
            DispatchError::Courier(e) => e.class(),
            _ => ErrorClass::Conflict,
        }
    }
}

/// Assigns `order` to the free courier that needs the fewest ticks to reach it.
///
/// Steps are `distance / speed` with integer division. Among couriers with
/// the same minimal number of steps, the first one in `couriers` wins.
/// On success the order is Assigned (raising `OrderAssigned`) and the
/// courier is Busy; the chosen courier is returned.
///
/// On `InvalidState`, `EmptyCourierSet` and `NoSuitableCourier` nothing is
/// mutated. A failure from the aggregates themselves is surfaced as is; the
/// caller must then discard its unit of work.
pub fn dispatch<'a>(
    order: &mut Order,
    couriers: &'a mut [Courier],
) -> Result<&'a Courier, DispatchError> {
    if !order.status().can_assign() {
        return Err(DispatchError::InvalidState {
            status: order.status(),
        });
    }
    if couriers.is_empty() {
        return Err(DispatchError::EmptyCourierSet);
    }

    let target = order.location();
    let (index, steps) = couriers
        .iter()
        .enumerate()
        .filter(|(_, courier)| courier.is_free())
        .map(|(index, courier)| (index, courier.steps_to(&target)))
        .min_by_key(|&(_, steps)| steps)
        .ok_or(DispatchError::NoSuitableCourier)?;

    let courier = &mut couriers[index];
    order.assign_courier(courier.id())?;
    courier.set_busy()?;

    tracing::debug!(
        order_id = %order.id(),
        courier_id = %courier.id(),
        steps,
        "order dispatched"
    );

    Ok(courier)
}
