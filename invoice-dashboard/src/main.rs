use dotenvy::dotenv;
use invoice_dashboard::config::get_configuration;
use invoice_dashboard::services::{
    init_metrics, Database, PasswordCredentialsProvider, ViewCache,
};
use invoice_dashboard::startup::build_router;
use invoice_dashboard::AppState;
use service_core::error::AppError;
use service_core::observability::logging::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        AppError::from(e)
    })?;

    let telemetry = &configuration.telemetry;
    init_tracing(
        &telemetry.service_name,
        &telemetry.log_level,
        telemetry.otlp_endpoint.as_deref(),
        telemetry.log_format,
    );

    init_metrics()?;

    let database = Arc::new(Database::connect(&configuration.database).await?);
    if configuration.database.run_migrations {
        database.run_migrations().await?;
    }

    let view_cache = match configuration.view_cache.ttl_seconds {
        Some(ttl) => ViewCache::with_max_age(Duration::from_secs(ttl)),
        None => ViewCache::new(),
    };

    let credentials = Arc::new(PasswordCredentialsProvider::new(database.clone()));
    let state = AppState::new(database, credentials, Arc::new(view_cache)).with_session(
        configuration.server.secure_cookies,
        configuration.server.session_inactivity_hours,
    );

    let app = build_router(state);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting invoice-dashboard on {}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
