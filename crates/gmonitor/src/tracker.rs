//! Adding, refreshing and removing tracked repositories.
//!
//! Adding a repository saves its metadata and pulls its initial commits
//! through [`store::persist_commits`], the same duplicate-tolerant path the
//! sync engine uses.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection};
use serde::Serialize;
use thiserror::Error;

use crate::entity::repository::Model as RepositoryModel;
use crate::platform::{FetchClient, FetchError, short_error_message};
use crate::store::{self, StoreError, repositories};

/// Errors from tracker operations.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The name is not of the form `owner/name`.
    #[error("Invalid repository name: {name:?} (expected owner/name)")]
    InvalidName { name: String },

    /// The repository is already tracked.
    #[error("Repository already tracked: {name}")]
    AlreadyTracked { name: String },

    /// The repository is not tracked.
    #[error("Repository not tracked: {name}")]
    NotTracked { name: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of adding a repository.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedRepository {
    pub repository: RepositoryModel,
    /// Commits stored by the initial pull.
    pub commits_inserted: u64,
    /// Set when the initial commit pull failed; the next cycle retries it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_commit_error: Option<String>,
}

/// Check that `name` looks like `owner/name`.
pub fn validate_name(name: &str) -> Result<(), TrackError> {
    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };

    match name.split_once('/') {
        Some((owner, repo)) if valid_part(owner) && valid_part(repo) => Ok(()),
        _ => Err(TrackError::InvalidName {
            name: name.to_string(),
        }),
    }
}

/// Start tracking `name`.
///
/// Fetches metadata, saves the repository (restoring a soft-deleted row of the
/// same name), then stores commits created since `since`. A failed commit
/// pull does not undo the save; the error is returned in the result and the
/// sync engine catches up on its next cycle.
pub async fn track_repository(
    db: &DatabaseConnection,
    client: &dyn FetchClient,
    name: &str,
    since: DateTime<Utc>,
) -> Result<TrackedRepository, TrackError> {
    validate_name(name)?;

    let existing = repositories::find_by_name_with_deleted(db, name).await?;
    if existing.as_ref().is_some_and(|r| !r.is_deleted()) {
        return Err(TrackError::AlreadyTracked {
            name: name.to_string(),
        });
    }

    let remote = client.fetch_repository(name).await?;

    let repository = match existing {
        Some(deleted) => {
            tracing::info!(repo = name, "Restoring previously removed repository");
            let mut model = remote.to_metadata_update();
            model.id = ActiveValue::Unchanged(deleted.id);
            model.name = ActiveValue::NotSet;
            model.deleted_at = ActiveValue::Set(None);
            model.update(db).await.map_err(StoreError::from)?
        }
        None => {
            let mut model = remote.to_active_model();
            // Keep the name the caller used so lookups by that name succeed.
            model.name = ActiveValue::Set(name.to_string());
            repositories::insert(db, model).await.map_err(|e| match e {
                StoreError::Duplicate { name } => TrackError::AlreadyTracked { name },
                other => TrackError::Store(other),
            })?
        }
    };

    let (commits_inserted, initial_commit_error) =
        match pull_commits(db, client, &repository, since).await {
            Ok(inserted) => (inserted, None),
            Err(e) => {
                tracing::warn!(repo = name, error = %e, "Initial commit pull failed");
                (0, Some(short_error_message(&e)))
            }
        };

    tracing::info!(repo = name, commits_inserted, "Repository tracked");
    Ok(TrackedRepository {
        repository,
        commits_inserted,
        initial_commit_error,
    })
}

async fn pull_commits(
    db: &DatabaseConnection,
    client: &dyn FetchClient,
    repository: &RepositoryModel,
    since: DateTime<Utc>,
) -> Result<u64, TrackError> {
    let commits = client.fetch_commits(&repository.name, since).await?;
    Ok(store::persist_commits(db, repository.id, &commits).await?)
}

/// Re-fetch and store the metadata of a tracked repository.
pub async fn refresh_repository(
    db: &DatabaseConnection,
    client: &dyn FetchClient,
    name: &str,
) -> Result<RepositoryModel, TrackError> {
    let existing = repositories::find_by_name(db, name)
        .await?
        .ok_or_else(|| TrackError::NotTracked {
            name: name.to_string(),
        })?;

    let remote = client.fetch_repository(name).await?;
    let updated = repositories::update_metadata(db, existing.id, &remote).await?;
    tracing::info!(repo = name, stars = updated.stars, "Repository metadata refreshed");
    Ok(updated)
}

/// Stop tracking a repository. Stored commits are kept.
pub async fn untrack_repository(
    db: &DatabaseConnection,
    name: &str,
) -> Result<RepositoryModel, TrackError> {
    repositories::soft_delete(db, name).await.map_err(|e| match e {
        StoreError::NotFound { .. } => TrackError::NotTracked {
            name: name.to_string(),
        },
        other => TrackError::Store(other),
    })
}
