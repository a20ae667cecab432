//! HTTP surface of the page-view counters.
//!
//! `POST /traffic` records one view, `GET /traffic` reduces every counter into
//! a summary. Counter state lives behind [`tally_storage::CounterStore`].

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tally_storage::{CounterStore, MemoryCounterStore, SqliteCounterStore, StorageError};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod service;

use config::{Config, StoreBackend};
use error::StartupError;
use routes::{health_handler, ingest_handler, summary_handler};
pub use service::TrafficService;

pub fn open_store(backend: &StoreBackend) -> Result<Arc<dyn CounterStore>, StorageError> {
    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryCounterStore::new())),
        StoreBackend::Sqlite(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(err) = std::fs::create_dir_all(parent) {
                        error!(event = "store_dir_error", path = %parent.display(), error = %err);
                    }
                }
            }
            Ok(Arc::new(SqliteCounterStore::open(path)?))
        }
    }
}

pub fn router(service: TrafficService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/traffic", post(ingest_handler).get(summary_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(service)
}

pub async fn run(config: Config) -> Result<(), StartupError> {
    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|source| StartupError::Addr {
            addr: config.addr.clone(),
            source,
        })?;

    let store = open_store(&config.store)?;
    let app = router(TrafficService::new(store));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    info!(event = "hub_start", addr = %addr, store = ?config.store);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    info!(event = "hub_stop");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(event = "signal_error", error = %err);
            std::future::pending::<()>().await;
        }
        info!(event = "shutdown", signal = "ctrl_c");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!(event = "shutdown", signal = "terminate");
            }
            Err(err) => {
                error!(event = "signal_error", error = %err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
