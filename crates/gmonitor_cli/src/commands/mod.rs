#[cfg(feature = "migrate")]
pub(crate) mod migrate;
pub(crate) mod serve;
pub(crate) mod sync;
pub(crate) mod track;

use std::sync::Arc;

use gmonitor::github::GitHubClient;
use gmonitor::platform::FetchClient;
use sea_orm::DatabaseConnection;

use crate::config::Config;

pub(crate) type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Connect to the database, applying pending migrations when supported.
pub(crate) async fn open_database(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn std::error::Error>> {
    #[cfg(feature = "migrate")]
    let db = gmonitor::connect_and_migrate(database_url).await?;
    #[cfg(not(feature = "migrate"))]
    let db = gmonitor::connect(database_url).await?;
    Ok(db)
}

/// Build the GitHub client from configuration.
pub(crate) fn github_client(
    config: &Config,
) -> Result<Arc<dyn FetchClient>, Box<dyn std::error::Error>> {
    let client = GitHubClient::new(
        &config.github.api_url,
        config.github.token.clone(),
        config.github_timeout(),
    )?
    .with_max_pages(config.github.max_pages);

    if !client.is_authenticated() {
        tracing::warn!("No GitHub token configured; requests are subject to the anonymous rate limit");
    }
    Ok(Arc::new(client))
}
