mod cli;
mod config;
mod error;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use aigateway_core::{AdminOps, ProviderRegistry, Selector};
use aigateway_storage::{SeaOrmCredentialStore, SeaOrmEventStore, SeaOrmProviderTraceStore, connect_shared, sync_schema};

use crate::cli::Cli;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let events_enabled = cli.events_enabled();
    let app_config =
        config::load_app_config(&PathBuf::from(&cli.config), events_enabled, aigateway_common::DEFAULT_RETENTION_DAYS)?;

    let db = connect_shared(&cli.dsn).await.context("connect storage")?;
    sync_schema(&db).await.context("schema sync")?;

    let credentials = Arc::new(SeaOrmCredentialStore::new(db.clone()));
    let events = Arc::new(SeaOrmEventStore::new(db.clone(), events_enabled, app_config.retention_days));
    let traces = Arc::new(SeaOrmProviderTraceStore::new(db));

    let registry = Arc::new(ProviderRegistry::new(app_config, credentials.clone(), traces));
    let selector = Arc::new(Selector::new(registry.clone(), events.clone()));
    let admin = Arc::new(AdminOps::new(registry, credentials, events));

    let state = AppState { selector, admin };
    let app = routes::build_router(state);

    let bind = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&bind).await.with_context(|| format!("bind {bind}"))?;
    tracing::info!(event = "listening", addr = %bind);
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
