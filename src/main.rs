use std::sync::Arc;

use booking_server::config::Config;
use booking_server::jwt::TokenService;
use booking_server::store::{MemoryStore, PostgresStore, Store};
use booking_server::{app, seed, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            log::info!("Using Postgres store");
            Arc::new(PostgresStore::connect(url, config.max_connections).await?)
        }
        None => {
            log::warn!("No database configured, data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    seed::seed(store.as_ref(), &config).await?;

    let state = AppState::new(store, TokenService::from_config(&config));
    let app = app(state);

    log::info!("Starting booking HTTP server on http://{}", config.bind);
    axum::Server::bind(&config.bind)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
