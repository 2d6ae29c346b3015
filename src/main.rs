use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cineclub_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, Cache, MemoryStore, PgStore, Store},
    services::TmdbProvider,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cineclub_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let store = PgStore::connect(url).await?;
            tracing::info!("Connected to Postgres");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let (cache, writer) = match config.redis_url.as_deref() {
        Some(url) => {
            let client = create_redis_client(url)?;
            let (cache, writer) = Cache::new(client).await;
            (cache, Some(writer))
        }
        None => {
            tracing::warn!("REDIS_URL not set, TMDB responses will not be cached");
            (Cache::disabled(), None)
        }
    };

    let catalog = Arc::new(TmdbProvider::new(
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_language.clone(),
    ));

    let address = config.bind_address();
    let state = AppState::new(store, catalog, config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server running on http://{}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = writer {
        writer.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
