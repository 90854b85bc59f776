//! Sync engine types, outcomes and defaults.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::platform::{FetchError, short_error_message};
use crate::store::StoreError;

/// Default maximum number of repositories synced concurrently within a cycle.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Default time between cycle starts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default deadline for one repository's upstream fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default offset, in seconds, added to the watermark so the newest stored
/// commit is not requested again.
pub const DEFAULT_GRACE_SECS: i64 = 1;

/// Lower bound used for repositories with no stored commits.
pub fn default_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// Options shared by the sync unit and the scheduler.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Time between cycle starts.
    pub poll_interval: Duration,
    /// Maximum repositories in flight per cycle (minimum 1).
    pub concurrency: usize,
    /// Deadline for one repository's fetch.
    pub fetch_timeout: Duration,
    /// Offset added to the watermark.
    pub grace: TimeDelta,
    /// Watermark for repositories with no commits.
    pub epoch: DateTime<Utc>,
    /// Run the first cycle immediately instead of after one interval.
    pub run_on_start: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            grace: TimeDelta::seconds(DEFAULT_GRACE_SECS),
            epoch: default_epoch(),
            run_on_start: true,
        }
    }
}

/// Why one repository failed to sync.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading the watermark or writing commits failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Upstream fetch failed.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Upstream did not answer before the per-repository deadline.
    #[error("Fetch timed out after {}s", after.as_secs_f64())]
    Timeout { after: Duration },

    /// The task running the unit panicked.
    #[error("Sync task panicked: {message}")]
    Panicked { message: String },
}

/// Result of syncing one repository.
#[derive(Debug)]
#[must_use]
pub enum SyncOutcome {
    /// The repository is not (or no longer) tracked.
    Skipped,
    /// Upstream returned no commits past the watermark.
    UpToDate,
    /// Commits were fetched and persisted.
    Synced {
        /// Commits returned by upstream.
        fetched: usize,
        /// Of those, rows that were new.
        inserted: u64,
    },
    /// Shutdown was requested before the fetch finished.
    Cancelled,
    /// The unit failed; siblings are unaffected.
    Failed(SyncError),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcome of one repository within a cycle.
#[derive(Debug)]
pub struct RepositorySync {
    pub name: String,
    pub outcome: SyncOutcome,
}

/// One failed repository in a cycle summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub repository: String,
    pub error: String,
}

/// Aggregate result of one cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleSummary {
    /// 1-based cycle number within this scheduler.
    pub cycle: u64,
    /// Repositories listed at the start of the cycle.
    pub repositories: usize,
    /// Repositories that persisted at least one fetched commit batch.
    pub synced: usize,
    pub up_to_date: usize,
    pub skipped: usize,
    pub cancelled: usize,
    /// Newly inserted commit rows across all repositories.
    pub commits_added: u64,
    pub failures: Vec<SyncFailure>,
    /// Set when the repository listing itself failed and nothing ran.
    pub list_error: Option<String>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl CycleSummary {
    /// Fold one unit's outcome into the summary.
    pub fn record(&mut self, result: RepositorySync) {
        match result.outcome {
            SyncOutcome::Skipped => self.skipped += 1,
            SyncOutcome::UpToDate => self.up_to_date += 1,
            SyncOutcome::Synced { inserted, .. } => {
                self.synced += 1;
                self.commits_added += inserted;
            }
            SyncOutcome::Cancelled => self.cancelled += 1,
            SyncOutcome::Failed(e) => self.failures.push(SyncFailure {
                repository: result.name,
                error: short_error_message(&e),
            }),
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every listed repository finished without failure.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.list_error.is_none()
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }
}

/// Lifecycle of the cycle scheduler.
///
/// `Idle → Running → Idle` per cycle; cancellation moves through `Draining`
/// (in-flight units finishing) to the terminal `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running { cycle: u64 },
    Draining,
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_CONCURRENCY, 20);
        assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_secs(60));
        assert_eq!(DEFAULT_FETCH_TIMEOUT, Duration::from_secs(30));
        assert_eq!(SyncOptions::default().grace, TimeDelta::seconds(1));
        assert_eq!(default_epoch().timestamp(), 0);
    }

    #[test]
    fn test_sync_options_default() {
        let options = SyncOptions::default();
        assert_eq!(options.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(options.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(options.run_on_start);
    }

    #[test]
    fn test_summary_records_every_outcome() {
        let mut summary = CycleSummary::default();
        let outcomes = [
            ("a", SyncOutcome::Skipped),
            ("b", SyncOutcome::UpToDate),
            (
                "c",
                SyncOutcome::Synced {
                    fetched: 5,
                    inserted: 3,
                },
            ),
            (
                "d",
                SyncOutcome::Synced {
                    fetched: 2,
                    inserted: 2,
                },
            ),
            ("e", SyncOutcome::Cancelled),
            (
                "f",
                SyncOutcome::Failed(SyncError::Timeout {
                    after: Duration::from_secs(30),
                }),
            ),
        ];
        for (name, outcome) in outcomes {
            summary.record(RepositorySync {
                name: name.to_string(),
                outcome,
            });
        }

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.up_to_date, 1);
        assert_eq!(summary.synced, 2);
        assert_eq!(summary.commits_added, 5);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures[0].repository, "f");
        assert!(summary.failures[0].error.contains("timed out"));
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_empty_summary_is_clean() {
        assert!(CycleSummary::default().is_clean());
    }

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::from(FetchError::status(500, "https://x"));
        assert!(err.to_string().contains("Fetch error"));
        assert!(err.to_string().contains("500"));

        let err = SyncError::Panicked {
            message: "boom".to_string(),
        };
        assert!(err.to_string().contains("panicked"));
    }

    #[test]
    fn test_summary_serializes_elapsed_as_millis() {
        let summary = CycleSummary {
            elapsed: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["elapsed"], 1500);
    }
}
