//! Read-side snapshots of couriers and orders.

use common::{CourierId, OrderId};
use domain::{Courier, CourierStatus, Location, Order, OrderStatus};
use serde::Serialize;
use store::DeliveryStore;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocationView {
    pub x: i32,
    pub y: i32,
}

impl From<Location> for LocationView {
    fn from(location: Location) -> Self {
        Self {
            x: location.x(),
            y: location.y(),
        }
    }
}

/// Current state of a courier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourierView {
    pub id: CourierId,
    pub name: String,
    pub location: LocationView,
    pub transport_id: i32,
    pub status: CourierStatus,
}

impl From<&Courier> for CourierView {
    fn from(courier: &Courier) -> Self {
        Self {
            id: courier.id(),
            name: courier.name().to_string(),
            location: courier.location().into(),
            transport_id: courier.transport().id(),
            status: courier.status(),
        }
    }
}

/// Current state of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub location: LocationView,
    pub status: OrderStatus,
    pub courier_id: Option<CourierId>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().clone(),
            location: order.location().into(),
            status: order.status(),
            courier_id: order.courier_id(),
        }
    }
}

/// Lists every courier.
pub async fn list_couriers<S>(store: &S) -> Result<Vec<CourierView>>
where
    S: DeliveryStore + ?Sized,
{
    let couriers = store.list_couriers().await?;
    Ok(couriers.iter().map(CourierView::from).collect())
}

/// Lists orders that are Created or Assigned.
pub async fn list_active_orders<S>(store: &S) -> Result<Vec<OrderView>>
where
    S: DeliveryStore + ?Sized,
{
    let orders = store.list_active_orders().await?;
    Ok(orders.iter().map(OrderView::from).collect())
}
