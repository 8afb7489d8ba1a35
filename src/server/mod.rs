//! HTTP surface
//!
//! Public read endpoints over the content store plus a small admin surface
//! driving the scheduler. Routes live in [`api`].

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::resolver::AnswerResolver;
use crate::scheduler::Scheduler;
use crate::storage::ContentStore;

pub use api::create_router;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub resolver: Arc<AnswerResolver>,
    pub scheduler: Arc<Scheduler>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<ContentStore>,
        resolver: Arc<AnswerResolver>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            store,
            resolver,
            scheduler,
            start_time: Instant::now(),
        }
    }
}

/// Build the router with all routes and layers
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = create_router(state);

    if config.cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves
pub async fn serve(
    state: AppState,
    config: &ServerConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = config.bind_addr()?;
    let router = build_router(state, config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server shutdown complete");
    Ok(())
}
