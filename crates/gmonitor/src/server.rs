//! Read API over the store.
//!
//! A small axum router: add a repository, look one up, list its commits, and
//! rank commit authors. Reads go through the [`Cache`] first.

mod handlers;
mod response;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::cache::{Cache, DEFAULT_CACHE_TTL};
use crate::platform::FetchClient;
use crate::sync::default_epoch;

pub use response::{ApiError, Envelope};

/// Shared state for the API handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub client: Arc<dyn FetchClient>,
    pub cache: Arc<dyn Cache>,
    /// Lifetime of cached responses.
    pub cache_ttl: Duration,
    /// Lower bound for the initial commit pull when the request gives none.
    pub epoch: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        client: Arc<dyn FetchClient>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            db,
            client,
            cache,
            cache_ttl: DEFAULT_CACHE_TTL,
            epoch: default_epoch(),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.epoch = epoch;
        self
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/repos",
            get(handlers::get_repository).post(handlers::create_repository),
        )
        .route("/api/v1/repos/commits", get(handlers::list_commits))
        .route("/api/v1/repos/commit-authors", get(handlers::commit_authors))
        .with_state(state)
}

/// Serve the API on `listener` until `cancel` fires.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "API listening");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::info!("API stopped");
    Ok(())
}
