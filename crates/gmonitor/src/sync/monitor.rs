//! The per-repository sync unit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::platform::FetchClient;
use crate::store::{self, StoreError, repositories};

use super::types::{SyncError, SyncOptions, SyncOutcome};

/// Synchronizes one repository at a time: watermark, fetch, persist.
///
/// A `Monitor` is cheap to clone and is shared by every unit of a cycle.
#[derive(Clone)]
pub struct Monitor {
    db: Arc<DatabaseConnection>,
    client: Arc<dyn FetchClient>,
    options: SyncOptions,
}

impl Monitor {
    pub fn new(
        db: Arc<DatabaseConnection>,
        client: Arc<dyn FetchClient>,
        options: SyncOptions,
    ) -> Self {
        Self {
            db,
            client,
            options,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Lower bound for the next fetch of `repository_id`: its newest stored
    /// commit (or the epoch) plus the grace offset.
    pub async fn since(&self, repository_id: Uuid) -> Result<DateTime<Utc>, StoreError> {
        let watermark = store::latest_commit_at(&self.db, repository_id)
            .await?
            .unwrap_or(self.options.epoch);
        Ok(watermark + self.options.grace)
    }

    /// Sync one repository by name.
    ///
    /// Never returns an error: every failure is folded into
    /// [`SyncOutcome::Failed`] so a unit cannot take down its siblings.
    /// Cancellation aborts an in-flight fetch; a persist that has started
    /// always runs to completion.
    pub async fn sync(&self, name: &str, cancel: &CancellationToken) -> SyncOutcome {
        let repository = match repositories::find_by_name(&self.db, name).await {
            Ok(Some(repository)) => repository,
            Ok(None) => {
                tracing::debug!(repo = name, "Repository no longer tracked, skipping");
                return SyncOutcome::Skipped;
            }
            Err(e) => return SyncOutcome::Failed(e.into()),
        };

        let since = match self.since(repository.id).await {
            Ok(since) => since,
            Err(e) => return SyncOutcome::Failed(e.into()),
        };

        let fetch = tokio::time::timeout(
            self.options.fetch_timeout,
            self.client.fetch_commits(name, since),
        );
        let commits = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SyncOutcome::Cancelled,
            result = fetch => match result {
                Ok(Ok(commits)) => commits,
                Ok(Err(e)) => return SyncOutcome::Failed(e.into()),
                Err(_) => {
                    return SyncOutcome::Failed(SyncError::Timeout {
                        after: self.options.fetch_timeout,
                    });
                }
            },
        };

        if commits.is_empty() {
            tracing::debug!(repo = name, since = %since, "No new commits");
            return SyncOutcome::UpToDate;
        }

        match store::persist_commits(&self.db, repository.id, &commits).await {
            Ok(inserted) => {
                tracing::info!(
                    repo = name,
                    fetched = commits.len(),
                    inserted,
                    "Persisted commits"
                );
                SyncOutcome::Synced {
                    fetched: commits.len(),
                    inserted,
                }
            }
            Err(e) => SyncOutcome::Failed(e.into()),
        }
    }
}
