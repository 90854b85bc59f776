use chrono::{DateTime, Utc};
use gmonitor::store::{commits, repositories};
use gmonitor::tracker;

use super::{CommandResult, github_client, open_database};
use crate::config::Config;

pub(crate) async fn handle_track(
    config: &Config,
    database_url: &str,
    name: &str,
    since: Option<DateTime<Utc>>,
) -> CommandResult {
    let db = open_database(database_url).await?;
    let client = github_client(config)?;
    let since = since.unwrap_or_else(|| config.sync_options().epoch);

    let tracked = tracker::track_repository(&db, client.as_ref(), name, since).await?;

    println!(
        "Tracking {} ({} stars), {} commits stored",
        tracked.repository.name, tracked.repository.stars, tracked.commits_inserted
    );
    if let Some(error) = tracked.initial_commit_error {
        println!("Initial commit pull failed, will retry on next sync: {error}");
    }
    Ok(())
}

pub(crate) async fn handle_refresh(config: &Config, database_url: &str, name: &str) -> CommandResult {
    let db = open_database(database_url).await?;
    let client = github_client(config)?;

    let repository = tracker::refresh_repository(&db, client.as_ref(), name).await?;
    println!(
        "Refreshed {}: {} stars, {} forks, {} open issues",
        repository.name, repository.stars, repository.forks, repository.open_issues
    );
    Ok(())
}

pub(crate) async fn handle_untrack(database_url: &str, name: &str) -> CommandResult {
    let db = open_database(database_url).await?;
    let repository = tracker::untrack_repository(&db, name).await?;
    println!("Stopped tracking {}", repository.name);
    Ok(())
}

pub(crate) async fn handle_list(database_url: &str) -> CommandResult {
    let db = open_database(database_url).await?;
    let tracked = repositories::find_all(&db).await?;

    if tracked.is_empty() {
        println!("No repositories tracked.");
        return Ok(());
    }

    for repository in tracked {
        let count = commits::count_for_repository(&db, repository.id).await?;
        let latest = commits::latest_commit_at(&db, repository.id)
            .await?
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<40} {:>8} commits  latest {}",
            repository.name, count, latest
        );
    }
    Ok(())
}
