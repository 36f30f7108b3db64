//! Orchestrator entry point.

use std::sync::Arc;

use bus::InMemoryBus;
use drops::{DropRegistry, IdRange, InMemoryDropRegistry, RedisDropRegistry};
use inventory::{InMemoryInventoryRepository, InventoryRepository, PostgresInventoryRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::config::Config;
use orchestrator::error::StartupError;
use orchestrator::routes::sagas::AppState;
use orchestrator::runtime::{Backends, Catalog, Runtime};
use orchestrator::telemetry;
use saga_store::{InMemorySagaStore, PostgresSagaStore, SagaStore};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = Config::from_env();
    telemetry::init_tracing(&config);
    let metrics_handle = telemetry::init_metrics()?;
    let catalog = Catalog::load(&config)?;

    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let sagas = PostgresSagaStore::new(pool.clone());
            sagas.run_migrations().await?;
            tracing::info!("using PostgreSQL saga store and inventory");
            with_drops(
                &config,
                catalog,
                metrics_handle,
                Arc::new(sagas),
                Arc::new(PostgresInventoryRepository::new(pool)),
            )
            .await
        }
        None => {
            tracing::info!("using in-memory saga store and inventory");
            with_drops(
                &config,
                catalog,
                metrics_handle,
                Arc::new(InMemorySagaStore::new()),
                Arc::new(InMemoryInventoryRepository::new()),
            )
            .await
        }
    }
}

async fn with_drops<S, R>(
    config: &Config,
    catalog: Catalog,
    metrics_handle: PrometheusHandle,
    sagas: Arc<S>,
    inventory: Arc<R>,
) -> Result<(), StartupError>
where
    S: SagaStore + 'static,
    R: InventoryRepository + 'static,
{
    match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let registry = RedisDropRegistry::connect(&client, IdRange::default()).await?;
            tracing::info!("using redis drop registry");
            serve(config, catalog, metrics_handle, sagas, inventory, Arc::new(registry)).await
        }
        None => {
            let registry = InMemoryDropRegistry::new();
            serve(config, catalog, metrics_handle, sagas, inventory, Arc::new(registry)).await
        }
    }
}

async fn serve<S, R, D>(
    config: &Config,
    catalog: Catalog,
    metrics_handle: PrometheusHandle,
    sagas: Arc<S>,
    inventory: Arc<R>,
    drops: Arc<D>,
) -> Result<(), StartupError>
where
    S: SagaStore + 'static,
    R: InventoryRepository + 'static,
    D: DropRegistry + 'static,
{
    let backends = Backends {
        sagas,
        inventory,
        drops,
    };
    let runtime = Runtime::start(config, InMemoryBus::new(), backends, catalog).await?;

    let state = Arc::new(AppState {
        engine: runtime.engine().clone(),
    });
    let app = orchestrator::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting orchestrator");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    runtime.shutdown().await;
    tracing::info!("server shut down gracefully");
    Ok(())
}
