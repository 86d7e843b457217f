//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use crate::auth::JwtVerifier;
use crate::state::AppState;
use anyhow::{Context, Result};
use inkseal_core::{Config, SystemClock};
use inkseal_db::{PostgresAuditRepository, PostgresDocumentRepository};
use inkseal_services::{create_notifier, create_storage, DocumentLifecycle, LifecycleSettings};
use std::sync::Arc;

/// Wire configuration, database, storage and services into a ready router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(backend = ?config.storage_backend(), "Storage initialized");

    let lifecycle = DocumentLifecycle::new(
        Arc::new(PostgresDocumentRepository::new(pool.clone())),
        Arc::new(PostgresAuditRepository::new(pool.clone())),
        storage.clone(),
        create_notifier(&config),
        Arc::new(SystemClock),
        LifecycleSettings::from_config(&config),
    );

    let state = Arc::new(AppState::new(
        lifecycle,
        storage,
        Some(pool),
        JwtVerifier::new(config.jwt_secret()),
        config.trusted_proxy_count(),
    ));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
