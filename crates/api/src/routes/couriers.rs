//! Courier registration and listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use dispatch::CourierView;
use domain::{Location, Transport};
use serde::{Deserialize, Serialize};
use store::DeliveryStore;

use super::orders::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RegisterCourierRequest {
    pub name: String,
    /// Transport name from the catalog, e.g. `"car"`.
    pub transport: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Serialize)]
pub struct CourierRegisteredResponse {
    pub courier_id: String,
}

/// POST /couriers: registers a Free courier.
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn register<S: DeliveryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterCourierRequest>,
) -> Result<(StatusCode, Json<CourierRegisteredResponse>), ApiError> {
    let transport = Transport::from_name(&req.transport)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let location =
        Location::new(req.x, req.y).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let courier_id = state
        .intake
        .register_courier(&req.name, transport, location)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CourierRegisteredResponse {
            courier_id: courier_id.to_string(),
        }),
    ))
}

/// GET /couriers: lists every courier.
pub async fn list<S: DeliveryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<CourierView>>, ApiError> {
    let couriers = dispatch::list_couriers(&state.store).await?;
    Ok(Json(couriers))
}
