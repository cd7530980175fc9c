//! Periodic scheduling of the assignment, movement and relay batches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use store::DeliveryStore;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::assign::{AssignReport, assign_orders};
use crate::error::Result;
use crate::movement::{MoveReport, move_couriers};
use crate::publisher::EventPublisher;
use crate::relay::{OutboxRelay, RelayConfig, RelayReport};

/// One of the three periodic batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    AssignOrders,
    MoveCouriers,
    RelayOutbox,
}

impl Trigger {
    pub const ALL: [Trigger; 3] = [
        Trigger::AssignOrders,
        Trigger::MoveCouriers,
        Trigger::RelayOutbox,
    ];

    /// Name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::AssignOrders => "assign_orders",
            Trigger::MoveCouriers => "move_couriers",
            Trigger::RelayOutbox => "relay_outbox",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interval of each trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    pub assign: Duration,
    pub movement: Duration,
    pub relay: Duration,
}

impl TickSchedule {
    pub fn interval(&self, trigger: Trigger) -> Duration {
        match trigger {
            Trigger::AssignOrders => self.assign,
            Trigger::MoveCouriers => self.movement,
            Trigger::RelayOutbox => self.relay,
        }
    }
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self {
            assign: Duration::from_millis(1000),
            movement: Duration::from_millis(2000),
            relay: Duration::from_millis(3000),
        }
    }
}

/// Result of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    Assign(AssignReport),
    Move(MoveReport),
    Relay(RelayReport),
}

struct Inner<S, P> {
    store: S,
    relay: OutboxRelay<S, P>,
    assign_lock: Mutex<()>,
    move_lock: Mutex<()>,
    relay_lock: Mutex<()>,
}

impl<S, P> Inner<S, P> {
    fn lock(&self, trigger: Trigger) -> &Mutex<()> {
        match trigger {
            Trigger::AssignOrders => &self.assign_lock,
            Trigger::MoveCouriers => &self.move_lock,
            Trigger::RelayOutbox => &self.relay_lock,
        }
    }
}

/// Runs the three batches on independent intervals.
///
/// A batch never overlaps with another batch of the same trigger; batches
/// of different triggers run concurrently. Failures are logged and the
/// trigger simply runs again at its next tick.
pub struct TickDriver<S, P> {
    inner: Arc<Inner<S, P>>,
    schedule: TickSchedule,
}

impl<S, P> Clone for TickDriver<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            schedule: self.schedule,
        }
    }
}

impl<S, P> TickDriver<S, P>
where
    S: DeliveryStore + Clone + 'static,
    P: EventPublisher + 'static,
{
    /// Creates a new driver.
    pub fn new(store: S, publisher: P, relay_config: RelayConfig, schedule: TickSchedule) -> Self {
        let relay = OutboxRelay::new(store.clone(), publisher, relay_config);
        Self {
            inner: Arc::new(Inner {
                store,
                relay,
                assign_lock: Mutex::new(()),
                move_lock: Mutex::new(()),
                relay_lock: Mutex::new(()),
            }),
            schedule,
        }
    }

    pub fn schedule(&self) -> &TickSchedule {
        &self.schedule
    }

    /// Runs a single batch now.
    ///
    /// Waits for an in-flight batch of the same trigger to finish first.
    pub async fn run_once(&self, trigger: Trigger) -> Result<TickReport> {
        let _guard = self.inner.lock(trigger).lock().await;
        let started = Instant::now();

        let result = match trigger {
            Trigger::AssignOrders => assign_orders(&self.inner.store)
                .await
                .map(TickReport::Assign),
            Trigger::MoveCouriers => move_couriers(&self.inner.store)
                .await
                .map(TickReport::Move),
            Trigger::RelayOutbox => self.inner.relay.run_batch().await.map(TickReport::Relay),
        };

        metrics::histogram!("tick_duration_seconds", "trigger" => trigger.as_str())
            .record(started.elapsed().as_secs_f64());
        if result.is_err() {
            metrics::counter!("tick_failures_total", "trigger" => trigger.as_str()).increment(1);
        }
        result
    }

    /// Starts one task per trigger. Each stops once `shutdown` turns true,
    /// after its in-flight batch has finished.
    pub fn spawn(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        Trigger::ALL
            .into_iter()
            .map(|trigger| {
                let driver = self.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move { driver.run_loop(trigger, shutdown).await })
            })
            .collect()
    }

    /// Runs all triggers until `shutdown` turns true.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        for result in join_all(self.spawn(shutdown)).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "tick loop terminated abnormally");
            }
        }
    }

    async fn run_loop(self, trigger: Trigger, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.schedule.interval(trigger));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(%trigger, interval = ?self.schedule.interval(trigger), "tick loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            // A panic inside the batch surfaces as a JoinError instead of
            // ending the loop.
            let driver = self.clone();
            let batch = tokio::spawn(async move { driver.run_once(trigger).await });

            match batch.await {
                Ok(Ok(report)) => tracing::debug!(%trigger, ?report, "tick completed"),
                Ok(Err(e)) => tracing::error!(%trigger, error = %e, "tick failed"),
                Err(e) => {
                    metrics::counter!("tick_failures_total", "trigger" => trigger.as_str())
                        .increment(1);
                    tracing::error!(%trigger, error = %e, "tick panicked");
                }
            }
        }

        tracing::info!(%trigger, "tick loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use common::{CourierId, EventId, OrderId};
    use domain::{Courier, Location, Order, OrderStatus, Transport};
    use store::{InMemoryDeliveryStore, OutboxRecord, UnitOfWork};
    use tokio::sync::Notify;

    use super::*;
    use crate::publisher::InMemoryEventBus;

    /// Holds every listing of created orders until released, tracking how
    /// many are held at once.
    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl Gate {
        async fn pass(&self) {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Delegates to an in-memory store. Listing created orders can panic
    /// once, or wait on a [`Gate`].
    #[derive(Clone, Default)]
    struct HookedStore {
        inner: InMemoryDeliveryStore,
        panic_once: bool,
        panicked: Arc<AtomicBool>,
        gate: Option<Arc<Gate>>,
    }

    impl HookedStore {
        fn panicking_once() -> Self {
            Self {
                panic_once: true,
                ..Self::default()
            }
        }

        fn gated() -> (Self, Arc<Gate>) {
            let gate = Arc::new(Gate::default());
            let store = Self {
                gate: Some(Arc::clone(&gate)),
                ..Self::default()
            };
            (store, gate)
        }
    }

    #[async_trait]
    impl DeliveryStore for HookedStore {
        async fn get_courier(&self, id: CourierId) -> store::Result<Option<Courier>> {
            self.inner.get_courier(id).await
        }
        async fn get_order(&self, id: &OrderId) -> store::Result<Option<Order>> {
            self.inner.get_order(id).await
        }
        async fn list_couriers(&self) -> store::Result<Vec<Courier>> {
            self.inner.list_couriers().await
        }
        async fn list_free_couriers(&self) -> store::Result<Vec<Courier>> {
            self.inner.list_free_couriers().await
        }
        async fn list_busy_couriers(&self) -> store::Result<Vec<Courier>> {
            self.inner.list_busy_couriers().await
        }
        async fn list_created_orders(&self) -> store::Result<Vec<Order>> {
            if self.panic_once && !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("listing exploded");
            }
            if let Some(gate) = &self.gate {
                gate.pass().await;
            }
            self.inner.list_created_orders().await
        }
        async fn list_assigned_orders(&self) -> store::Result<Vec<Order>> {
            self.inner.list_assigned_orders().await
        }
        async fn list_active_orders(&self) -> store::Result<Vec<Order>> {
            self.inner.list_active_orders().await
        }
        async fn commit(&self, unit_of_work: UnitOfWork) -> store::Result<()> {
            self.inner.commit(unit_of_work).await
        }
        async fn pending_outbox_after(
            &self,
            after: i64,
            limit: usize,
        ) -> store::Result<Vec<OutboxRecord>> {
            self.inner.pending_outbox_after(after, limit).await
        }
        async fn mark_processed(
            &self,
            event_id: EventId,
            processed_at: DateTime<Utc>,
        ) -> store::Result<()> {
            self.inner.mark_processed(event_id, processed_at).await
        }
    }

    async fn seed<S: DeliveryStore>(store: &S) {
        let mut courier =
            Courier::create("courier1", Transport::Car, Location::new(1, 1).unwrap()).unwrap();
        let mut order = Order::create("B1", Location::new(2, 2).unwrap()).unwrap();
        let mut uow = UnitOfWork::new();
        uow.add_courier(&mut courier).unwrap();
        uow.add_order(&mut order).unwrap();
        store.commit(uow).await.unwrap();
    }

    fn fast_schedule() -> TickSchedule {
        TickSchedule {
            assign: Duration::from_millis(10),
            movement: Duration::from_millis(20),
            relay: Duration::from_millis(30),
        }
    }

    #[tokio::test]
    async fn test_run_once_per_trigger() {
        let store = InMemoryDeliveryStore::new();
        let bus = InMemoryEventBus::new();
        seed(&store).await;
        let driver = TickDriver::new(
            store.clone(),
            bus.clone(),
            RelayConfig::default(),
            TickSchedule::default(),
        );

        let report = driver.run_once(Trigger::AssignOrders).await.unwrap();
        assert!(matches!(report, TickReport::Assign(r) if r.assigned == 1));

        let report = driver.run_once(Trigger::MoveCouriers).await.unwrap();
        assert!(matches!(report, TickReport::Move(r) if r.completed == 1));

        let report = driver.run_once(Trigger::RelayOutbox).await.unwrap();
        assert!(matches!(report, TickReport::Relay(r) if r.published == 2));
        assert_eq!(bus.published().await.len(), 2);
    }

    #[tokio::test]
    async fn test_run_once_reports_infrastructure_failure() {
        let store = InMemoryDeliveryStore::new();
        let driver = TickDriver::new(
            store.clone(),
            InMemoryEventBus::new(),
            RelayConfig::default(),
            TickSchedule::default(),
        );
        store.set_unavailable(true);

        for trigger in Trigger::ALL {
            assert!(driver.run_once(trigger).await.unwrap_err().is_infrastructure());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_loops_deliver_until_shutdown() {
        let store = InMemoryDeliveryStore::new();
        let bus = InMemoryEventBus::new();
        seed(&store).await;
        let driver = TickDriver::new(
            store.clone(),
            bus.clone(),
            RelayConfig::default(),
            fast_schedule(),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = driver.spawn(shutdown_rx);

        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown_tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        let order = store.get_order(&"B1".try_into().unwrap()).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert!(store.pending_outbox(10).await.unwrap().is_empty());
        assert_eq!(bus.published().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_batch_does_not_stop_the_loop() {
        let store = HookedStore::panicking_once();
        seed(&store).await;
        let driver = TickDriver::new(
            store.clone(),
            InMemoryEventBus::new(),
            RelayConfig::default(),
            fast_schedule(),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let loop_handle = tokio::spawn({
            let driver = driver.clone();
            async move { driver.run(shutdown_rx).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        loop_handle.await.unwrap();

        assert!(store.panicked.load(Ordering::SeqCst));
        assert!(store.inner.list_created_orders().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_trigger_never_runs_twice_at_once() {
        let (store, gate) = HookedStore::gated();
        let driver = TickDriver::new(
            store,
            InMemoryEventBus::new(),
            RelayConfig::default(),
            TickSchedule::default(),
        );

        let first = tokio::spawn({
            let driver = driver.clone();
            async move { driver.run_once(Trigger::AssignOrders).await }
        });
        gate.entered.notified().await;

        let second = tokio::spawn({
            let driver = driver.clone();
            async move { driver.run_once(Trigger::AssignOrders).await }
        });
        tokio::time::sleep(Duration::from_millis(500)).await;

        // The second batch waits behind the first instead of entering.
        assert_eq!(gate.active.load(Ordering::SeqCst), 1);
        assert!(!second.is_finished());

        // Other triggers are not held up by the slow assignment.
        driver.run_once(Trigger::MoveCouriers).await.unwrap();

        gate.release.notify_one();
        first.await.unwrap().unwrap();
        gate.release.notify_one();
        second.await.unwrap().unwrap();

        assert_eq!(gate.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_lets_in_flight_batch_commit() {
        let (store, gate) = HookedStore::gated();
        seed(&store).await;
        let driver = TickDriver::new(
            store.clone(),
            InMemoryEventBus::new(),
            RelayConfig::default(),
            TickSchedule::default(),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = driver.spawn(shutdown_rx);

        // The first assignment tick fires immediately and blocks on the gate.
        gate.entered.notified().await;
        shutdown_tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let assign_loop = &handles[0];
        assert!(!assign_loop.is_finished());
        let order_id: OrderId = "B1".try_into().unwrap();
        let order = store.inner.get_order(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Created);

        gate.release.notify_one();
        for handle in handles {
            handle.await.unwrap();
        }

        let order = store.inner.get_order(&order_id).await.unwrap().unwrap();
        assert_ne!(order.status(), OrderStatus::Created);
        assert!(order.courier_id().is_some());
        assert_eq!(gate.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_already_shut_down_loop_exits_immediately() {
        let driver = TickDriver::new(
            InMemoryDeliveryStore::new(),
            InMemoryEventBus::new(),
            RelayConfig::default(),
            TickSchedule::default(),
        );
        let (_shutdown_tx, shutdown_rx) = watch::channel(true);

        driver.run(shutdown_rx).await;
    }
}
