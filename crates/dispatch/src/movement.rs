//! The MoveCouriers batch.

use std::collections::HashMap;

use common::CourierId;
use domain::{Courier, MoveOutcome, Order, move_courier};
use store::{DeliveryStore, StoreError, UnitOfWork};

use crate::error::Result;

/// What one MoveCouriers batch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveReport {
    /// Couriers whose new location was committed.
    pub moved: usize,
    /// Orders delivered in this batch.
    pub completed: usize,
    /// Couriers skipped because of a conflict or missing order.
    pub skipped: usize,
    /// Couriers whose movement broke an invariant.
    pub failed: usize,
}

/// Moves every Busy courier one tick toward its assigned order.
///
/// Each courier is handled independently in its own unit of work. When a
/// courier arrives, the same unit of work completes the order and releases
/// the courier. A store outage aborts the batch.
#[tracing::instrument(skip_all)]
pub async fn move_couriers<S>(store: &S) -> Result<MoveReport>
where
    S: DeliveryStore + ?Sized,
{
    let mut report = MoveReport::default();

    let couriers = store.list_busy_couriers().await?;
    if couriers.is_empty() {
        return Ok(report);
    }
    let mut targets: HashMap<CourierId, Order> = store
        .list_assigned_orders()
        .await?
        .into_iter()
        .filter_map(|order| order.courier_id().map(|id| (id, order)))
        .collect();

    for mut courier in couriers {
        let courier_id = courier.id();
        let Some(mut order) = targets.remove(&courier_id) else {
            tracing::warn!(%courier_id, "busy courier has no assigned order");
            report.skipped += 1;
            continue;
        };

        let outcome = match move_courier(&mut courier, &order.location()) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    %courier_id,
                    order_id = %order.id(),
                    error = %e,
                    "movement failed"
                );
                report.failed += 1;
                continue;
            }
        };

        match commit_move(store, &mut courier, &mut order, &outcome).await {
            Ok(()) => {
                if outcome.from != outcome.to {
                    metrics::counter!("movement_couriers_moved_total").increment(1);
                    report.moved += 1;
                }
                if outcome.arrived {
                    metrics::counter!("movement_orders_completed_total").increment(1);
                    tracing::info!(%courier_id, order_id = %order.id(), "order delivered");
                    report.completed += 1;
                } else {
                    tracing::debug!(
                        %courier_id,
                        from = %outcome.from,
                        to = %outcome.to,
                        "courier moved"
                    );
                }
            }
            Err(MoveFailure::Store(e)) if e.is_infrastructure() => return Err(e.into()),
            Err(MoveFailure::Store(e)) => {
                tracing::warn!(%courier_id, error = %e, "move not committed");
                report.skipped += 1;
            }
            Err(MoveFailure::Completion(e)) => {
                tracing::warn!(
                    %courier_id,
                    order_id = %order.id(),
                    error = %e,
                    "arrival rejected"
                );
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}

enum MoveFailure {
    Store(StoreError),
    Completion(domain::DomainError),
}

impl From<StoreError> for MoveFailure {
    fn from(e: StoreError) -> Self {
        MoveFailure::Store(e)
    }
}

async fn commit_move<S>(
    store: &S,
    courier: &mut Courier,
    order: &mut Order,
    outcome: &MoveOutcome,
) -> std::result::Result<(), MoveFailure>
where
    S: DeliveryStore + ?Sized,
{
    let mut uow = UnitOfWork::new();

    if outcome.arrived {
        order
            .complete()
            .map_err(|e| MoveFailure::Completion(e.into()))?;
        courier
            .set_free()
            .map_err(|e| MoveFailure::Completion(e.into()))?;
        uow.update_order(order)?;
    }
    uow.update_courier(courier)?;

    store.commit(uow).await?;
    Ok(())
}
