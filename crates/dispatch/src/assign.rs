//! The AssignOrders batch.

use domain::{Courier, DispatchError, Order, dispatch};
use store::{DeliveryStore, StoreError, UnitOfWork};

use crate::error::Result;

/// What one AssignOrders batch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignReport {
    pub assigned: usize,
    /// Orders left in Created because no courier was free.
    pub without_courier: usize,
    /// Orders skipped because of a conflict; retried next tick.
    pub skipped: usize,
}

/// Dispatches every Created order against the pool of Free couriers.
///
/// Orders are handled one at a time, each in its own unit of work. A
/// courier taken by one order is removed from the pool before the next
/// order is dispatched. Conflicts skip the order; a store outage aborts the
/// batch.
#[tracing::instrument(skip_all)]
pub async fn assign_orders<S>(store: &S) -> Result<AssignReport>
where
    S: DeliveryStore + ?Sized,
{
    let mut report = AssignReport::default();

    let orders = store.list_created_orders().await?;
    if orders.is_empty() {
        return Ok(report);
    }
    let mut pool = store.list_free_couriers().await?;

    for mut order in orders {
        let courier_id = match dispatch(&mut order, &mut pool) {
            Ok(courier) => courier.id(),
            Err(DispatchError::EmptyCourierSet | DispatchError::NoSuitableCourier) => {
                metrics::counter!("dispatch_no_courier_total").increment(1);
                tracing::debug!(order_id = %order.id(), "no free courier");
                report.without_courier += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id(), error = %e, "dispatch rejected");
                report.skipped += 1;
                continue;
            }
        };

        // Whatever happens to the commit, this courier is spent for this tick.
        let Some(index) = pool.iter().position(|c| c.id() == courier_id) else {
            continue;
        };
        let mut courier = pool.remove(index);

        match commit_assignment(store, &mut order, &mut courier).await {
            Ok(()) => {
                metrics::counter!("dispatch_orders_assigned_total").increment(1);
                tracing::info!(order_id = %order.id(), %courier_id, "order assigned");
                report.assigned += 1;
            }
            Err(e) if e.is_infrastructure() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id(),
                    %courier_id,
                    error = %e,
                    "assignment not committed"
                );
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}

async fn commit_assignment<S>(
    store: &S,
    order: &mut Order,
    courier: &mut Courier,
) -> std::result::Result<(), StoreError>
where
    S: DeliveryStore + ?Sized,
{
    let mut uow = UnitOfWork::new();
    uow.update_order(order)?;
    uow.update_courier(courier)?;
    store.commit(uow).await
}
