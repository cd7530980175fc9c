//! API server entry point.

use api::config::Config;
use dispatch::{LoggingPublisher, TickDriver};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use store::{DeliveryStore, InMemoryDeliveryStore, PostgresDeliveryStore};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn describe_metrics() {
    metrics::describe_counter!("orders_created_total", "Orders accepted by intake");
    metrics::describe_counter!("couriers_registered_total", "Couriers registered");
    metrics::describe_counter!("dispatch_orders_assigned_total", "Orders assigned to a courier");
    metrics::describe_counter!("dispatch_no_courier_total", "Orders left waiting for a courier");
    metrics::describe_counter!("movement_couriers_moved_total", "Courier steps taken");
    metrics::describe_counter!("movement_orders_completed_total", "Orders delivered");
    metrics::describe_counter!("outbox_records_captured_total", "Outbox rows written");
    metrics::describe_counter!("outbox_relay_published_total", "Outbox rows published");
    metrics::describe_counter!("outbox_relay_failed_total", "Outbox rows that failed to publish");
    metrics::describe_counter!("tick_failures_total", "Ticks aborted by an infrastructure error");
    metrics::describe_histogram!("tick_duration_seconds", "Wall time of a single tick");
}

/// Runs the HTTP server and the tick driver over `store` until shutdown.
async fn serve<S>(config: &Config, store: S, metrics_handle: PrometheusHandle)
where
    S: DeliveryStore + Clone + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let driver = TickDriver::new(
        store.clone(),
        LoggingPublisher,
        config.relay.clone(),
        config.schedule,
    );
    let tick_handles = driver.spawn(shutdown_rx);

    let state = api::create_default_state(store);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    let _ = shutdown_tx.send(true);
    for handle in tick_handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "tick loop terminated abnormally");
        }
    }

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    describe_metrics();

    // 3. Pick the store and serve
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to Postgres");
            let store = PostgresDeliveryStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using Postgres delivery store");
            serve(&config, store, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory delivery store");
            serve(&config, InMemoryDeliveryStore::new(), metrics_handle).await;
        }
    }
}
