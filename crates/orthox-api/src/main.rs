//! orthox-api - HTTP API server for orthox

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use orthox_api::{router, telemetry, AppState, ServerConfig, StoreBackend};
use orthox_core::CaseStore;
use orthox_db::{log_pool_metrics, Database, InMemoryCaseStore, PoolConfig};
use orthox_inference::{GeminiAdapters, InferenceConfig};
use orthox_pipeline::{Capabilities, PipelineConfig, PipelineOrchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let _file_guard = telemetry::init_tracing(&telemetry::LogSettings::from_env());
    let config = ServerConfig::from_env()?;

    let store: Arc<dyn CaseStore> = match config.store_backend {
        StoreBackend::Postgres => {
            info!(subsystem = "api", "Connecting to database...");
            let pool_config = PoolConfig::new().max_connections(config.db_max_connections);
            let db = Database::connect_with_config(&config.database_url, pool_config).await?;
            if config.run_migrations {
                db.migrate().await?;
                info!(subsystem = "api", "Migrations applied");
            }
            log_pool_metrics(db.pool());
            Arc::new(db)
        }
        StoreBackend::Memory => {
            warn!(
                subsystem = "api",
                "Using in-memory case store, data is lost on restart"
            );
            Arc::new(InMemoryCaseStore::new())
        }
    };

    let adapters = GeminiAdapters::build(InferenceConfig::from_env())?;
    let strategy = adapters.reasoner.strategy();
    let pipeline_config = PipelineConfig::from_env();
    if let Some(budget) = adapters.reasoner.dedicated_budget() {
        pipeline_config.check_fallback_budget(budget)?;
    }
    let capabilities = Capabilities {
        vision: adapters.vision,
        reasoner: adapters.reasoner,
        classifier: adapters.classifier,
        advisor: adapters.advisor,
        assessor: adapters.outcome,
    };

    info!(
        subsystem = "api",
        store_backend = store.backend_name(),
        strategy = %strategy,
        capability_timeout_secs = pipeline_config.capability_timeout.as_secs(),
        "Pipeline configured"
    );
    let pipeline = PipelineOrchestrator::new(store, capabilities, pipeline_config);
    let app = router(AppState::new(pipeline, strategy), &config);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!(subsystem = "api", "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(subsystem = "api", error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(subsystem = "api", "Shutdown signal received");
}
