//! Roulette Back binary entrypoint wiring configuration, storage and the REST layer.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roulette_back::{
    config::AppConfig,
    dao::game_store::{
        RouletteStore,
        file::{FileRouletteStore, FileStoreConfig},
        memory::MemoryRouletteStore,
    },
    routes,
    state::{AppState, SharedState},
};

/// Environment variable selecting the storage backend (`file` or `memory`).
const STORE_ENV: &str = "ROULETTE_STORE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = open_store().await?;
    let app_state = AppState::new(store, config);

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Open the backend named by [`STORE_ENV`], defaulting to JSON files on disk.
async fn open_store() -> anyhow::Result<Arc<dyn RouletteStore>> {
    let backend = env::var(STORE_ENV).unwrap_or_else(|_| "file".into());
    match backend.as_str() {
        "memory" => {
            warn!("using the in-memory store; every score is lost on shutdown");
            Ok(Arc::new(MemoryRouletteStore::new()))
        }
        other => {
            if other != "file" {
                warn!(backend = other, "unknown {STORE_ENV} value; using the file store");
            }
            let config = FileStoreConfig::from_env();
            info!(root = %config.root.display(), "opening file store");
            let store = FileRouletteStore::open(config)
                .await
                .context("opening file store")?;
            Ok(Arc::new(store))
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
