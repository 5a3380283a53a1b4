use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsdesk::api::ApiClient;
use newsdesk::config::Config;
use newsdesk::favorites::{log_notices, Favorites};
use newsdesk::routes::{self, AppState};
use newsdesk::snapshot::SqliteSnapshot;
use newsdesk::store::ResilientStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsdesk=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load_or_default("newsdesk.toml")?.with_env_overrides()?;
    info!("Using backend at {}", config.api_url);

    // Initialize local snapshot
    let snapshot = SqliteSnapshot::new(&config.snapshot_url).await?;
    snapshot.initialize().await?;
    match snapshot.updated_at().await? {
        Some(updated_at) => info!("Local snapshot initialized, last written {}", updated_at),
        None => info!("Local snapshot initialized, empty"),
    }

    let remote = Arc::new(ApiClient::new(&config.api_url)?);
    let store = Arc::new(ResilientStore::new(remote, Arc::new(snapshot)));

    // Load favorites in the background so serving starts immediately
    let favorites = Arc::new(Favorites::new(store.clone()));
    tokio::spawn(log_notices(favorites.subscribe()));
    favorites.spawn_initialize();

    let state = Arc::new(AppState {
        store,
        favorites,
        categories: config.categories.clone(),
    });

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Server starting on http://{}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
