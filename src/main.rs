use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use fleet_rental::config::{DatabaseConfig, EnvironmentConfig, StorageBackend};
use fleet_rental::database;
use fleet_rental::repositories::{InMemoryLedger, Ledger, PgLedger};
use fleet_rental::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = EnvironmentConfig::from_env().context("invalid configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    info!(environment = %config.environment, "🚀 Iniciando servicio de alquiler de flota");

    let ledger: Arc<dyn Ledger> = match config.storage_backend {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env().context("invalid database configuration")?;
            let pool = database::connect(&db_config)
                .await
                .context("could not open the database")?;
            Arc::new(PgLedger::new(pool, db_config.lock_timeout_ms))
        }
        StorageBackend::Memory => {
            if config.is_production() {
                warn!("⚠️ Ledger en memoria en producción: los registros se pierden al reiniciar");
            }
            Arc::new(InMemoryLedger::with_lock_timeout(Duration::from_secs(5)))
        }
    };

    let addr: SocketAddr = config
        .server_url()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_url()))?;

    let app = fleet_rental::create_app(AppState::new(ledger, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "🌐 Servidor escuchando");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "❌ Error del servidor");
        return Err(e.into());
    }

    info!("👋 Servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "❌ No se pudo escuchar Ctrl+C");
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
                error!(error = %e, "❌ No se pudo escuchar SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("🛑 Ctrl+C recibido, cerrando"),
        _ = terminate => info!("🛑 SIGTERM recibido, cerrando"),
    }
}
