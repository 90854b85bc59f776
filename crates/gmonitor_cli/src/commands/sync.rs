use std::sync::Arc;

use gmonitor::sync::{CycleSummary, Monitor, Worker};
use tokio_util::sync::CancellationToken;

use super::{CommandResult, github_client, open_database};
use crate::config::Config;
use crate::progress::LoggingReporter;

/// Run one sync cycle and print its summary.
pub(crate) async fn handle_sync(
    config: &Config,
    database_url: &str,
    cancel: CancellationToken,
) -> CommandResult {
    let db = Arc::new(open_database(database_url).await?);
    let client = github_client(config)?;

    let worker = Worker::new(Monitor::new(db, client, config.sync_options()))
        .with_progress(LoggingReporter::callback());
    let summary = worker.run_cycle(&cancel).await;

    print_summary(&summary);

    match summary.list_error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

fn print_summary(summary: &CycleSummary) {
    println!(
        "Synced {} repositories in {:.1}s: {} updated, {} up to date, {} skipped, {} failed, {} cancelled",
        summary.repositories,
        summary.elapsed.as_secs_f64(),
        summary.synced,
        summary.up_to_date,
        summary.skipped,
        summary.failed(),
        summary.cancelled,
    );
    println!("{} new commits", summary.commits_added);

    for failure in &summary.failures {
        println!("  {}: {}", failure.repository, failure.error);
    }
}
