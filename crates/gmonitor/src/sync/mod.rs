//! The synchronization engine.
//!
//! # Module Structure
//!
//! - [`types`] - Options, outcomes, cycle summary and scheduler state
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`monitor`] - The per-repository sync unit
//! - [`worker`] - The interval scheduler and bounded fan-out
//!
//! # Example
//!
//! ```ignore
//! use gmonitor::sync::{Monitor, SyncOptions, Worker};
//! use tokio_util::sync::CancellationToken;
//!
//! let monitor = Monitor::new(Arc::new(db), Arc::new(client), SyncOptions::default());
//! let worker = Worker::new(monitor);
//! let cancel = CancellationToken::new();
//! worker.run_forever(cancel.clone()).await;
//! ```

mod monitor;
mod progress;
mod types;
mod worker;

pub use monitor::Monitor;
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use types::{
    CycleSummary, DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT, DEFAULT_GRACE_SECS,
    DEFAULT_POLL_INTERVAL, RepositorySync, SchedulerState, SyncError, SyncFailure, SyncOptions,
    SyncOutcome, default_epoch,
};
pub use worker::Worker;
