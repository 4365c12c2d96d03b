use anyhow::Result;
use datalogger_service::{
    config::AppConfig,
    http::{self, AppState},
    hub::Hub,
    observability, Pipeline, Store,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Instant};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        observability::init_metrics(&metrics_cfg.bind_addr);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.url)
        .await?;

    let store = Arc::new(Store::open(pool, cfg.sampling.interval_secs).await?);
    let hub = Arc::new(Hub::new());
    let pipeline = Arc::new(Pipeline::new(store, hub));

    let state = AppState {
        pipeline,
        started_at: Instant::now(),
    };

    let addr: SocketAddr = cfg
        .http
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "datalogger service listening");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
