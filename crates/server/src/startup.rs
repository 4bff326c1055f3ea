use std::future::Future;
use std::sync::Arc;

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::info;

use service::{
    runtime,
    setup::{EntrySource, SetupError, SetupFlow},
    storage::JsonFileBlobStore,
    ScheduleStore,
};

use crate::routes::{self, AppState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Create the single config entry on first start; later starts find it and
/// carry on.
async fn import_entry(cfg: &AppConfig) -> anyhow::Result<()> {
    let marker = std::path::Path::new(&cfg.storage.data_dir)
        .join(format!("{}.entry.json", cfg.storage.storage_key));
    let flow = SetupFlow::load(marker).await;
    match flow.create_entry(EntrySource::Import).await {
        Ok(entry) => info!(entry_id = %entry.entry_id, "store configured"),
        Err(SetupError::SingleInstanceAllowed) => info!("store already configured"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Start the store against the configured blob file and build the router.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<(Router, Arc<ScheduleStore>)> {
    runtime::ensure_env(&cfg.storage.data_dir).await?;
    import_entry(cfg).await?;

    let store = Arc::new(ScheduleStore::new());
    let backend = JsonFileBlobStore::new(
        cfg.storage.blob_path(),
        cfg.storage.storage_key.clone(),
        cfg.storage.version,
    );
    store.start(backend).await;

    let app = routes::build_router(AppState { store: Arc::clone(&store) }, build_cors());
    Ok((app, store))
}

/// Serve until `shutdown` resolves, then stop the store.
pub async fn run_until<F>(cfg: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (app, store) = build_app(&cfg).await?;

    let addr = cfg.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, blob = %cfg.storage.blob_path().display(), "starting schedule server");
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    store.stop();
    Ok(())
}

/// Public entry: serve until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    run_until(cfg, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("received Ctrl+C, shutting down");
    })
    .await
}
