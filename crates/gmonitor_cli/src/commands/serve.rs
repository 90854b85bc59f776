use std::sync::Arc;

use gmonitor::cache::MemoryCache;
use gmonitor::server::{self, AppState};
use gmonitor::sync::{Monitor, Worker};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::{CommandResult, github_client, open_database};
use crate::config::Config;
use crate::progress::LoggingReporter;

/// Run the sync scheduler and the API until `cancel` fires.
pub(crate) async fn handle_serve(
    config: &Config,
    database_url: &str,
    cancel: CancellationToken,
) -> CommandResult {
    let db = Arc::new(open_database(database_url).await?);
    let client = github_client(config)?;
    let options = config.sync_options();

    let listener = TcpListener::bind(config.bind_addr()).await?;

    let state = AppState::new(
        Arc::clone(&db),
        Arc::clone(&client),
        Arc::new(MemoryCache::new(config.cache.max_entries)),
    )
    .with_cache_ttl(config.cache_ttl())
    .with_epoch(options.epoch);

    let worker = Worker::new(Monitor::new(db, client, options))
        .with_progress(LoggingReporter::callback());

    let api = {
        let cancel = cancel.clone();
        async move {
            let result = server::serve(listener, state, cancel.clone()).await;
            // The scheduler has no reason to keep running without the API.
            cancel.cancel();
            result
        }
    };

    let ((), api_result) = tokio::join!(worker.run_forever(cancel), api);
    api_result?;

    tracing::info!("Shutdown complete");
    Ok(())
}
