use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CourierId, EventId, OrderId};
use domain::{Courier, Order};

use crate::{OutboxRecord, Result, StoreError, UnitOfWork};

/// Persistence boundary for couriers, orders and the outbox.
///
/// Listings return aggregates in insertion order. Every read returns fresh
/// state; nothing is cached between calls. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn get_courier(&self, id: CourierId) -> Result<Option<Courier>>;

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>>;

    async fn list_couriers(&self) -> Result<Vec<Courier>>;

    async fn list_free_couriers(&self) -> Result<Vec<Courier>>;

    async fn list_busy_couriers(&self) -> Result<Vec<Courier>>;

    async fn list_created_orders(&self) -> Result<Vec<Order>>;

    async fn list_assigned_orders(&self) -> Result<Vec<Order>>;

    /// Orders that are Created or Assigned.
    async fn list_active_orders(&self) -> Result<Vec<Order>>;

    /// Commits a unit of work atomically.
    ///
    /// Either every change and every outbox record becomes durable, or none
    /// does. Fails with `ConcurrencyConflict` if any updated aggregate was
    /// changed since it was loaded, and with `DuplicateAggregate` if an
    /// inserted one already exists.
    async fn commit(&self, unit_of_work: UnitOfWork) -> Result<()>;

    /// Returns up to `limit` pending outbox records whose position is
    /// greater than `after`, oldest first.
    async fn pending_outbox_after(&self, after: i64, limit: usize) -> Result<Vec<OutboxRecord>>;

    /// Returns up to `limit` pending outbox records, oldest first.
    async fn pending_outbox(&self, limit: usize) -> Result<Vec<OutboxRecord>> {
        self.pending_outbox_after(0, limit).await
    }

    /// Marks an outbox record as published.
    ///
    /// Marking an already processed record is a no-op.
    async fn mark_processed(&self, event_id: EventId, processed_at: DateTime<Utc>) -> Result<()>;
}

/// Extension trait providing convenience methods for delivery stores.
#[async_trait]
pub trait DeliveryStoreExt: DeliveryStore {
    async fn order_exists(&self, id: &OrderId) -> Result<bool> {
        Ok(self.get_order(id).await?.is_some())
    }

    /// Loads an order or fails with `NotFound`.
    async fn require_order(&self, id: &OrderId) -> Result<Order> {
        self.get_order(id).await?.ok_or_else(|| StoreError::NotFound {
            kind: "Order",
            id: id.to_string(),
        })
    }

    /// Loads a courier or fails with `NotFound`.
    async fn require_courier(&self, id: CourierId) -> Result<Courier> {
        self.get_courier(id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: "Courier",
                id: id.to_string(),
            })
    }
}

// Blanket implementation for all DeliveryStore implementations
impl<T: DeliveryStore + ?Sized> DeliveryStoreExt for T {}
