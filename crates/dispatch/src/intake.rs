//! Order intake and courier registration.

use common::{CourierId, OrderId};
use domain::{Courier, DomainError, Location, Order, OrderError, Transport};
use store::{DeliveryStore, DeliveryStoreExt, StoreError, UnitOfWork};

use crate::error::Result;
use crate::geocoder::Geocoder;

/// Outcome of [`OrderIntake::create_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCreation {
    Created(OrderId),
    /// An order for this basket was created before; nothing changed.
    AlreadyExists(OrderId),
}

impl OrderCreation {
    pub fn order_id(&self) -> &OrderId {
        match self {
            OrderCreation::Created(id) | OrderCreation::AlreadyExists(id) => id,
        }
    }
}

/// Entry point for new orders and couriers.
pub struct OrderIntake<S, G> {
    store: S,
    geocoder: G,
}

impl<S, G> OrderIntake<S, G>
where
    S: DeliveryStore,
    G: Geocoder,
{
    /// Creates a new intake service.
    pub fn new(store: S, geocoder: G) -> Self {
        Self { store, geocoder }
    }

    /// Creates an order for a confirmed basket, delivered to `street`.
    ///
    /// Idempotent: a basket that already has an order is acknowledged
    /// without change, including when a concurrent request wins the insert.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, basket_id: &str, street: &str) -> Result<OrderCreation> {
        let order_id =
            OrderId::new(basket_id).map_err(|_| DomainError::from(OrderError::IdRequired))?;

        if self.store.order_exists(&order_id).await? {
            tracing::debug!(%order_id, "order already exists");
            return Ok(OrderCreation::AlreadyExists(order_id));
        }

        let location = self.geocoder.locate(street).await?;
        let mut order = Order::new(order_id.clone(), location);

        let mut uow = UnitOfWork::new();
        uow.add_order(&mut order)?;

        match self.store.commit(uow).await {
            Ok(()) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(%order_id, %location, "order created");
                Ok(OrderCreation::Created(order_id))
            }
            Err(StoreError::DuplicateAggregate { .. }) => {
                tracing::debug!(%order_id, "order created concurrently");
                Ok(OrderCreation::AlreadyExists(order_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Registers a new Free courier.
    #[tracing::instrument(skip(self))]
    pub async fn register_courier(
        &self,
        name: &str,
        transport: Transport,
        location: Location,
    ) -> Result<CourierId> {
        let mut courier =
            Courier::create(name, transport, location).map_err(DomainError::from)?;
        let courier_id = courier.id();

        let mut uow = UnitOfWork::new();
        uow.add_courier(&mut courier)?;
        self.store.commit(uow).await?;

        metrics::counter!("couriers_registered_total").increment(1);
        tracing::info!(%courier_id, transport = transport.name(), %location, "courier registered");
        Ok(courier_id)
    }
}
