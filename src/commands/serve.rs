//! Serve command - Starts the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{expose_diagnostics, AppError, AppResult};
use crate::infra::{Cache, Database, HealthProbe, LocalDocumentStore, StripeGateway};
use crate::services::Services;

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut config: Config) -> AppResult<()> {
    tracing::info!("Starting server...");

    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }
    expose_diagnostics(!config.environment.is_production());

    // Both tiers, with pending migrations applied
    let database = Arc::new(Database::connect(&config).await?);
    let cache = Arc::new(Cache::connect(&config).await?);
    let gateway = Arc::new(StripeGateway::new(&config)?);
    let documents = Arc::new(LocalDocumentStore::new(config.document_storage_dir.clone()));

    let addr = config.server_addr();
    let allowed_origins = config.allowed_origins.clone();
    let trust_proxy_headers = config.trust_proxy_headers;
    let services = Services::build(&database, documents, gateway, config);

    let probes = vec![
        database as Arc<dyn HealthProbe>,
        cache.clone() as Arc<dyn HealthProbe>,
    ];
    let app_state = AppState::new(&services, cache, probes, allowed_origins)
        .with_trusted_proxy_headers(trust_proxy_headers);

    // Build router
    let app = create_router(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
