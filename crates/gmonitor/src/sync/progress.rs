//! Progress reporting for sync cycles.
//!
//! The scheduler emits these events on the task that drives the cycle, after
//! each unit is joined, so callbacks never run concurrently with each other.

use super::types::CycleSummary;

/// Progress events emitted by the scheduler.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// A cycle listed its repositories and is about to fan out.
    CycleStarted {
        cycle: u64,
        /// Number of repositories that will be synced.
        repositories: usize,
    },

    /// A repository's unit persisted new commits.
    RepositorySynced {
        name: String,
        fetched: usize,
        inserted: u64,
    },

    /// A repository had nothing new upstream.
    RepositoryUpToDate { name: String },

    /// A repository disappeared between listing and syncing.
    RepositorySkipped { name: String },

    /// A repository's unit failed.
    RepositoryFailed { name: String, error: String },

    /// All units of a cycle have settled.
    CycleComplete { summary: CycleSummary },
}

/// Type alias for progress callback functions.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
