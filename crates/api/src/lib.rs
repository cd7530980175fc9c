//! HTTP surface for the delivery engine.
//!
//! Exposes order intake and courier registration over REST, plus read-only
//! listings, with structured logging (tracing) and Prometheus metrics. The
//! tick driver runs alongside the router in the binary.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use dispatch::{InMemoryGeocoder, OrderIntake};
use metrics_exporter_prometheus::PrometheusHandle;
use store::DeliveryStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DeliveryStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/couriers",
            get(routes::couriers::list::<S>).post(routes::couriers::register::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store` with the in-memory geocoder.
pub fn create_default_state<S: DeliveryStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    create_state(store, InMemoryGeocoder::new())
}

/// Creates the application state with a preconfigured geocoder.
pub fn create_state<S: DeliveryStore + Clone + 'static>(
    store: S,
    geocoder: InMemoryGeocoder,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        intake: OrderIntake::new(store.clone(), geocoder),
        store,
    })
}
