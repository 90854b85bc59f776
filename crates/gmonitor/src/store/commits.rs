use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, prelude::DateTimeWithTimeZone, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::commit::{ActiveModel, Column, Entity as Commit};
use crate::platform::RemoteCommit;

use super::errors::{Result, StoreError};

/// Rows per INSERT statement. Keeps the bound-parameter count well under
/// SQLite's limit.
pub const PERSIST_BATCH_SIZE: usize = 500;

/// Default number of retry attempts for transient persistence failures.
pub const DEFAULT_PERSIST_RETRIES: u32 = 3;

/// Default initial backoff delay in milliseconds for persistence retries.
pub const DEFAULT_PERSIST_BACKOFF_MS: u64 = 100;

// ─── Persistence ─────────────────────────────────────────────────────────────

/// Persist a batch of commits for one repository, skipping hashes that are
/// already stored.
///
/// Every row is tagged with `repository_id`. The whole batch is written in one
/// transaction with `ON CONFLICT (hash) DO NOTHING`, so duplicates from earlier
/// cycles, overlapping fetch windows or concurrent writers are ignored while
/// any other failure rolls the batch back. Transient failures (locked or busy
/// database, dropped connection) are retried with exponential backoff.
///
/// Returns the number of newly inserted rows. An empty batch is a no-op.
pub async fn persist_commits(
    db: &DatabaseConnection,
    repository_id: Uuid,
    commits: &[RemoteCommit],
) -> Result<u64> {
    persist_commits_with_retry(
        db,
        repository_id,
        commits,
        DEFAULT_PERSIST_RETRIES,
        DEFAULT_PERSIST_BACKOFF_MS,
    )
    .await
}

/// [`persist_commits`] with explicit retry settings (`max_retries = 0` disables retries).
pub async fn persist_commits_with_retry(
    db: &DatabaseConnection,
    repository_id: Uuid,
    commits: &[RemoteCommit],
    max_retries: u32,
    initial_backoff_ms: u64,
) -> Result<u64> {
    if commits.is_empty() {
        return Ok(0);
    }

    let models = build_models(repository_id, commits);
    tracing::debug!(
        repository_id = %repository_id,
        batch_size = models.len(),
        "Persisting commits"
    );

    let mut backoff_ms = initial_backoff_ms;
    let mut attempt = 0;
    loop {
        match persist_once(db, models.clone()).await {
            Ok(inserted) => return Ok(inserted),
            Err(e) if attempt < max_retries && is_retryable_db_error(&e) => {
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    backoff_ms,
                    error = %e,
                    "Commit persistence failed, retrying..."
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
            }
            Err(e) => return Err(StoreError::from(e)),
        }
    }
}

/// Insert a single commit through the same duplicate-tolerant path.
///
/// Returns `true` if the row was new.
pub async fn insert_commit(
    db: &DatabaseConnection,
    repository_id: Uuid,
    commit: &RemoteCommit,
) -> Result<bool> {
    let inserted = persist_commits(db, repository_id, std::slice::from_ref(commit)).await?;
    Ok(inserted > 0)
}

/// Dedup the input by hash (first occurrence wins) and tag every row.
fn build_models(repository_id: Uuid, commits: &[RemoteCommit]) -> Vec<ActiveModel> {
    let synced_at = Utc::now();
    let mut seen = HashSet::with_capacity(commits.len());
    commits
        .iter()
        .filter(|c| seen.insert(c.hash.as_str()))
        .map(|c| c.to_active_model(repository_id, synced_at))
        .collect()
}

/// Build the ON CONFLICT clause shared by every commit insert.
pub(crate) fn build_dedup_on_conflict() -> OnConflict {
    OnConflict::column(Column::Hash).do_nothing().to_owned()
}

async fn persist_once(db: &DatabaseConnection, models: Vec<ActiveModel>) -> std::result::Result<u64, DbErr> {
    let txn = db.begin().await?;

    let mut inserted = 0u64;
    for chunk in models.chunks(PERSIST_BATCH_SIZE) {
        inserted += Commit::insert_many(chunk.to_vec())
            .on_conflict(build_dedup_on_conflict())
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;
    Ok(inserted)
}

fn is_retryable_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            err_str.contains("locked")
                || err_str.contains("busy")
                || err_str.contains("timeout")
                || err_str.contains("temporarily unavailable")
        }
        _ => false,
    }
}

// ─── Watermark ───────────────────────────────────────────────────────────────

/// Newest stored commit date of one repository, or `None` if it has no commits.
///
/// Scoped to `repository_id`; commits of other repositories never move it.
pub async fn latest_commit_at(
    db: &DatabaseConnection,
    repository_id: Uuid,
) -> Result<Option<DateTime<Utc>>> {
    let latest = Commit::find()
        .select_only()
        .column(Column::CommittedAt)
        .filter(Column::RepositoryId.eq(repository_id))
        .order_by_desc(Column::CommittedAt)
        .limit(1)
        .into_tuple::<DateTimeWithTimeZone>()
        .one(db)
        .await?;

    Ok(latest.map(|at| at.with_timezone(&Utc)))
}

/// Number of stored commits for one repository.
pub async fn count_for_repository(db: &DatabaseConnection, repository_id: Uuid) -> Result<u64> {
    Commit::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .count(db)
        .await
        .map_err(StoreError::from)
}
