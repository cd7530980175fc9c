use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CourierId, EventId, OrderId, Version};
use domain::{Aggregate, Courier, CourierStatus, Order, OrderStatus};
use tokio::sync::RwLock;

use crate::{
    Change, ChangeKind, OutboxRecord, Result, StoreError, UnitOfWork, store::DeliveryStore,
};

#[derive(Default)]
struct State {
    couriers: Vec<Courier>,
    orders: Vec<Order>,
    outbox: Vec<OutboxRecord>,
    last_position: i64,
}

impl State {
    fn stored_version(&self, change: &Change) -> Option<Version> {
        match change {
            Change::Courier(_, courier) => self
                .couriers
                .iter()
                .find(|c| c.id() == courier.id())
                .map(|c| c.version()),
            Change::Order(_, order) => self
                .orders
                .iter()
                .find(|o| o.id() == order.id())
                .map(|o| o.version()),
        }
    }

    /// Checks the whole unit of work before anything is applied.
    fn validate(&self, unit_of_work: &UnitOfWork) -> Result<Vec<Version>> {
        let mut staged: HashMap<(&'static str, String), Version> = HashMap::new();
        let mut versions = Vec::with_capacity(unit_of_work.changes().len());

        for change in unit_of_work.changes() {
            let key = (change.aggregate_type(), change.aggregate_id());
            let current = staged
                .get(&key)
                .copied()
                .or_else(|| self.stored_version(change));
            let next = change.resolve(current)?;
            staged.insert(key, next);
            versions.push(next);
        }

        for record in unit_of_work.outbox() {
            if self.outbox.iter().any(|r| r.event_id == record.event_id) {
                return Err(StoreError::DuplicateAggregate {
                    aggregate_type: "OutboxRecord",
                    aggregate_id: record.event_id.to_string(),
                });
            }
        }

        Ok(versions)
    }

    fn apply(&mut self, change: Change, version: Version) {
        match change {
            Change::Courier(kind, mut courier) => {
                courier.set_version(version);
                match self.couriers.iter_mut().find(|c| c.id() == courier.id()) {
                    Some(stored) if kind == ChangeKind::Update => *stored = courier,
                    _ => self.couriers.push(courier),
                }
            }
            Change::Order(kind, mut order) => {
                order.set_version(version);
                match self.orders.iter_mut().find(|o| o.id() == order.id()) {
                    Some(stored) if kind == ChangeKind::Update => *stored = order,
                    _ => self.orders.push(order),
                }
            }
        }
    }
}

/// In-memory delivery store for tests and for running without a database.
///
/// Commits validate the whole unit of work under one write lock before
/// applying it, giving the same all-or-nothing behaviour as the PostgreSQL
/// transaction.
#[derive(Clone, Default)]
pub struct InMemoryDeliveryStore {
    state: Arc<RwLock<State>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryDeliveryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns every outbox record, processed or not, in insertion order.
    pub async fn outbox_records(&self) -> Vec<OutboxRecord> {
        self.state.read().await.outbox.clone()
    }

    /// Clears all couriers, orders and outbox records.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = State::default();
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    async fn couriers_where(&self, predicate: impl Fn(&Courier) -> bool) -> Result<Vec<Courier>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .couriers
            .iter()
            .filter(|c| predicate(c))
            .cloned()
            .collect())
    }

    async fn orders_where(&self, predicate: impl Fn(&Order) -> bool) -> Result<Vec<Order>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .filter(|o| predicate(o))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn get_courier(&self, id: CourierId) -> Result<Option<Courier>> {
        Ok(self.couriers_where(|c| c.id() == id).await?.pop())
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        Ok(self.orders_where(|o| o.id() == id).await?.pop())
    }

    async fn list_couriers(&self) -> Result<Vec<Courier>> {
        self.couriers_where(|_| true).await
    }

    async fn list_free_couriers(&self) -> Result<Vec<Courier>> {
        self.couriers_where(|c| c.status() == CourierStatus::Free).await
    }

    async fn list_busy_couriers(&self) -> Result<Vec<Courier>> {
        self.couriers_where(|c| c.status() == CourierStatus::Busy).await
    }

    async fn list_created_orders(&self) -> Result<Vec<Order>> {
        self.orders_where(|o| o.status() == OrderStatus::Created).await
    }

    async fn list_assigned_orders(&self) -> Result<Vec<Order>> {
        self.orders_where(|o| o.status() == OrderStatus::Assigned).await
    }

    async fn list_active_orders(&self) -> Result<Vec<Order>> {
        self.orders_where(|o| !o.status().is_terminal()).await
    }

    async fn commit(&self, unit_of_work: UnitOfWork) -> Result<()> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let versions = state.validate(&unit_of_work)?;
        let (changes, outbox) = unit_of_work.into_parts();
        let captured = outbox.len();

        for (change, version) in changes.into_iter().zip(versions) {
            state.apply(change, version);
        }
        for mut record in outbox {
            state.last_position += 1;
            record.position = state.last_position;
            state.outbox.push(record);
        }

        metrics::counter!("outbox_records_captured_total").increment(captured as u64);
        Ok(())
    }

    async fn pending_outbox_after(&self, after: i64, limit: usize) -> Result<Vec<OutboxRecord>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .outbox
            .iter()
            .filter(|r| r.is_pending() && r.position > after)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, event_id: EventId, processed_at: DateTime<Utc>) -> Result<()> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let record = state
            .outbox
            .iter_mut()
            .find(|r| r.event_id == event_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "OutboxRecord",
                id: event_id.to_string(),
            })?;

        if record.processed_on_utc.is_none() {
            record.processed_on_utc = Some(processed_at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use domain::{Location, Transport, dispatch};

    use super::*;

    fn courier(name: &str) -> Courier {
        Courier::create(name, Transport::Pedestrian, Location::min()).unwrap()
    }

    fn order(id: &str) -> Order {
        Order::create(id, Location::new(3, 3).unwrap()).unwrap()
    }

    async fn seeded_store(
        couriers: &mut [Courier],
        orders: &mut [Order],
    ) -> InMemoryDeliveryStore {
        let store = InMemoryDeliveryStore::new();
        let mut uow = UnitOfWork::new();
        for courier in couriers.iter_mut() {
            uow.add_courier(courier).unwrap();
        }
        for order in orders.iter_mut() {
            uow.add_order(order).unwrap();
        }
        store.commit(uow).await.unwrap();
        store
    }

    #[tokio::test]
    async fn add_and_get() {
        let mut couriers = [courier("courier1")];
        let mut orders = [order("B1")];
        let store = seeded_store(&mut couriers, &mut orders).await;

        let stored = store.get_courier(couriers[0].id()).await.unwrap().unwrap();
        assert_eq!(stored.name(), "courier1");
        assert_eq!(stored.version(), Version::new(1));

        let stored = store.get_order(orders[0].id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Created);
        assert!(store.get_courier(CourierId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listings_keep_insertion_order() {
        let mut couriers = [courier("c"), courier("a"), courier("b")];
        let store = seeded_store(&mut couriers, &mut []).await;

        let names: Vec<_> = store
            .list_free_couriers()
            .await
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let mut orders = [order("B1")];
        let store = seeded_store(&mut [], &mut orders).await;

        let mut uow = UnitOfWork::new();
        uow.add_order(&mut order("B1")).unwrap();
        let result = store.commit(uow).await;

        assert!(matches!(result, Err(StoreError::DuplicateAggregate { .. })));
    }

    #[tokio::test]
    async fn dispatch_commit_captures_outbox_and_updates_status() {
        let mut couriers = [courier("courier1")];
        let mut orders = [order("B1")];
        let store = seeded_store(&mut couriers, &mut orders).await;

        let mut order = store.get_order(orders[0].id()).await.unwrap().unwrap();
        let mut free = store.list_free_couriers().await.unwrap();
        dispatch(&mut order, &mut free).unwrap();

        let mut uow = UnitOfWork::new();
        uow.update_order(&mut order).unwrap();
        uow.update_courier(&mut free[0]).unwrap();
        store.commit(uow).await.unwrap();

        assert!(store.list_free_couriers().await.unwrap().is_empty());
        assert_eq!(store.list_busy_couriers().await.unwrap().len(), 1);
        assert_eq!(store.list_assigned_orders().await.unwrap().len(), 1);

        let pending = store.pending_outbox(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_type, "OrderAssigned");
        assert_eq!(pending[0].position, 1);
    }

    #[tokio::test]
    async fn stale_update_commits_nothing() {
        let mut couriers = [courier("courier1")];
        let mut orders = [order("B1")];
        let store = seeded_store(&mut couriers, &mut orders).await;

        let loaded = store.get_order(orders[0].id()).await.unwrap().unwrap();
        let courier_id = couriers[0].id();

        // First writer wins.
        let mut winner = loaded.clone();
        winner.assign_courier(courier_id).unwrap();
        let mut uow = UnitOfWork::new();
        uow.update_order(&mut winner).unwrap();
        store.commit(uow).await.unwrap();

        // Second writer holds the old version; its courier change must not land either.
        let mut loser = loaded;
        loser.assign_courier(courier_id).unwrap();
        let mut busy = store.get_courier(courier_id).await.unwrap().unwrap();
        busy.set_busy().unwrap();
        let mut uow = UnitOfWork::new();
        uow.update_courier(&mut busy).unwrap();
        uow.update_order(&mut loser).unwrap();
        let result = store.commit(uow).await;

        assert!(matches!(result, Err(StoreError::ConcurrencyConflict { .. })));
        assert_eq!(store.list_free_couriers().await.unwrap().len(), 1);
        assert_eq!(store.pending_outbox(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_aggregate_fails() {
        let store = InMemoryDeliveryStore::new();
        let mut uow = UnitOfWork::new();
        uow.update_courier(&mut courier("ghost")).unwrap();

        let result = store.commit(uow).await;

        assert!(matches!(result, Err(StoreError::NotFound { kind: "Courier", .. })));
    }

    #[tokio::test]
    async fn mark_processed_removes_from_pending() {
        let mut orders = [order("B1")];
        orders[0].assign_courier(CourierId::new()).unwrap();
        let store = seeded_store(&mut [], &mut orders).await;

        let pending = store.pending_outbox(10).await.unwrap();
        let event_id = pending[0].event_id;
        let first = Utc::now();
        store.mark_processed(event_id, first).await.unwrap();
        store.mark_processed(event_id, Utc::now()).await.unwrap();

        assert!(store.pending_outbox(10).await.unwrap().is_empty());
        let records = store.outbox_records().await;
        assert_eq!(records[0].processed_on_utc, Some(first));

        let unknown = store.mark_processed(EventId::new(), Utc::now()).await;
        assert!(matches!(unknown, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn pending_outbox_respects_limit_and_order() {
        let mut orders = [order("B1"), order("B2"), order("B3")];
        for order in orders.iter_mut() {
            order.assign_courier(CourierId::new()).unwrap();
        }
        let store = seeded_store(&mut [], &mut orders).await;

        let pending = store.pending_outbox(2).await.unwrap();

        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].aggregate_id, "B1");
        assert_eq!(pending[1].aggregate_id, "B2");
        assert!(pending[0].position < pending[1].position);

        let rest = store
            .pending_outbox_after(pending[1].position, 10)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].aggregate_id, "B3");
    }

    #[tokio::test]
    async fn unavailable_store_fails_with_infrastructure_error() {
        let store = InMemoryDeliveryStore::new();
        store.set_unavailable(true);

        let result = store.list_created_orders().await;
        assert!(result.unwrap_err().is_infrastructure());

        store.set_unavailable(false);
        assert!(store.list_created_orders().await.unwrap().is_empty());
    }
}
