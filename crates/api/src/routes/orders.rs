//! Order intake and listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use dispatch::{InMemoryGeocoder, OrderCreation, OrderIntake, OrderView};
use serde::{Deserialize, Serialize};
use store::DeliveryStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DeliveryStore> {
    pub intake: OrderIntake<S, InMemoryGeocoder>,
    pub store: S,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    /// Confirmed basket id; a fresh one is generated when absent.
    pub basket_id: Option<String>,
    pub street: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: String,
    pub created: bool,
}

// -- Handlers --

/// POST /orders: creates an order for a basket. Repeating a basket is a no-op.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: DeliveryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let basket_id = req
        .basket_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let outcome = state.intake.create_order(&basket_id, &req.street).await?;

    let (status, created) = match &outcome {
        OrderCreation::Created(_) => (StatusCode::CREATED, true),
        OrderCreation::AlreadyExists(_) => (StatusCode::OK, false),
    };

    Ok((
        status,
        Json(OrderCreatedResponse {
            order_id: outcome.order_id().to_string(),
            created,
        }),
    ))
}

/// GET /orders: lists orders that are Created or Assigned.
pub async fn list<S: DeliveryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = dispatch::list_active_orders(&state.store).await?;
    Ok(Json(orders))
}
