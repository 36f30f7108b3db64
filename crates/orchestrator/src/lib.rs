//! Saga orchestrator service.
//!
//! Wires the saga engine, the inventory, drop, quest and reactor engines and
//! their bus consumers into one process, runs the timeout sweeper and the
//! expiry tasks, and serves a small HTTP surface: health, Prometheus metrics
//! and read-only saga inspection.

pub mod config;
pub mod error;
pub mod routes;
pub mod runtime;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use bus::Publisher;
use metrics_exporter_prometheus::PrometheusHandle;
use saga_store::SagaStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::sagas::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, P>(state: Arc<AppState<S, P>>, metrics_handle: PrometheusHandle) -> Router
where
    S: SagaStore + 'static,
    P: Publisher + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/sagas", get(routes::sagas::list::<S, P>))
        .route("/sagas/{transaction_id}", get(routes::sagas::get::<S, P>))
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
