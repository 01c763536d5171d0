//! HTTP surface.
//!
//! An axum router over shared [`AppState`]. The cache routes are mounted only
//! when a cache client is configured.

pub mod handlers;
pub mod response;

use crate::cache::CacheClient;
use crate::db::AsyncFacade;
use crate::error::{DbError, DbResult};
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<AsyncFacade>,
    pub cache: Option<Arc<CacheClient>>,
}

impl AppState {
    pub fn new(facade: Arc<AsyncFacade>, cache: Option<Arc<CacheClient>>) -> Self {
        Self { facade, cache }
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/test1", get(handlers::list_user))
        .route("/test2", get(handlers::get_user))
        .route("/test3", get(handlers::get_user_name))
        .route("/test4", get(handlers::rename_user))
        .route("/test5", get(handlers::insert_users))
        .route("/test6", get(handlers::insert_user))
        .route("/test7/{page}", get(handlers::page_users));

    if state.cache.is_some() {
        app = app.route(
            "/cache/{key}",
            get(handlers::cache_get).put(handlers::cache_put),
        );
    }

    app.with_state(state)
}

/// Once a shutdown signal arrives, in-flight requests get this long to finish.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// Bind and serve until SIGINT or SIGTERM.
pub async fn serve(state: AppState, bind_addr: &str) -> DbResult<()> {
    let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
        DbError::connection(
            format!("Failed to bind to {}: {}", bind_addr, e),
            "Check that the port is available",
        )
    })?;
    info!(addr = %bind_addr, cache = state.cache.is_some(), "HTTP server listening");

    let shutdown_notify = Arc::new(tokio::sync::Notify::new());
    let notify = shutdown_notify.clone();
    let shutdown_signal = async move {
        wait_for_signal().await;
        notify.notify_one();
    };

    let server = axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal);

    tokio::select! {
        result = server => {
            match result {
                Ok(()) => info!("HTTP server stopped"),
                Err(e) => {
                    error!(error = %e, "HTTP server error");
                    return Err(DbError::internal(format!("HTTP server error: {}", e)));
                }
            }
        }
        _ = async {
            shutdown_notify.notified().await;
            info!(
                timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                "Waiting for requests to finish (send signal again to force exit)..."
            );
            tokio::select! {
                _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                    warn!("Graceful shutdown timeout, forcing exit");
                }
                _ = wait_for_signal() => {
                    warn!("Received second signal, forcing immediate exit");
                }
            }
        } => {}
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
