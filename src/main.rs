use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use apk_storefront::storage::BlobStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &apk_storefront::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.listen_addr,
        record_store = ?cfg.record_store,
        database_url = %cfg.database_url,
        data_dir = %cfg.data_dir.display(),
        upload_dir = %cfg.upload_dir.display(),
        frontend_dir = %cfg.frontend_dir.display(),
        loglevel = %cfg.loglevel
    );

    let record_store = apk_storefront::db::open_record_store(cfg).await?;
    let store = apk_storefront::db::spawn(record_store, cfg.seed_demo_accounts).await?;

    let blobs = BlobStore::new(&cfg.upload_dir);
    blobs.init().await?;

    let state = apk_storefront::StorefrontState::new(store, blobs, Arc::new((**cfg).clone()));
    let app = apk_storefront::storefront_router(state);

    let listener = TcpListener::bind(cfg.listen_addr.as_str()).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
