use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travelbook_api::{app, AppState};
use travelbook_store::app_config::{Config, StorageBackend};
use travelbook_store::{DbClient, StoreBookingRepository, StoreTravelOptionRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travelbook_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting TravelBook API on port {}", config.server.port);

    let app_state = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            AppState::in_memory(config.booking.clone())
        }
        StorageBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("storage.backend = \"postgres\" needs a [database] section")?;

            let db = DbClient::new(database)
                .await
                .context("Failed to connect to Postgres")?;
            if database.run_migrations {
                db.migrate().await.context("Failed to run migrations")?;
            }

            AppState::new(
                Arc::new(StoreTravelOptionRepository::new(db.pool.clone())),
                Arc::new(StoreBookingRepository::new(db.pool.clone())),
                config.booking.clone(),
            )
        }
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Unable to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
