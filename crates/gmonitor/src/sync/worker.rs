//! The cycle scheduler.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, interval_at};
use tokio_util::sync::CancellationToken;

use crate::platform::short_error_message;
use crate::store::repositories;

use super::monitor::Monitor;
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{CycleSummary, RepositorySync, SchedulerState, SyncError, SyncOutcome};

/// Runs sync cycles on a fixed interval, one cycle at a time.
///
/// Each cycle lists the tracked repositories and fans out one
/// [`Monitor::sync`] per repository, capped at `concurrency` in flight, then
/// waits for all of them before the next tick is honoured.
pub struct Worker {
    monitor: Monitor,
    state: watch::Sender<SchedulerState>,
    cycles: AtomicU64,
    on_progress: Option<ProgressCallback>,
}

impl Worker {
    pub fn new(monitor: Monitor) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            monitor,
            state,
            cycles: AtomicU64::new(0),
            on_progress: None,
        }
    }

    /// Receive progress events for every cycle.
    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Observe scheduler state transitions.
    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Number of cycles started so far.
    pub fn cycles_started(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }

    /// Run cycles until `cancel` fires, then return once the in-flight cycle
    /// (if any) has settled.
    pub async fn run_forever(&self, cancel: CancellationToken) {
        let options = self.monitor.options();
        let period = options.poll_interval;
        let mut ticker = if options.run_on_start {
            interval(period)
        } else {
            interval_at(tokio::time::Instant::now() + period, period)
        };
        // A cycle that overruns the interval swallows the missed ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = period.as_secs_f64(),
            concurrency = options.concurrency,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let summary = self.run_cycle(&cancel).await;
            log_summary(&summary);

            if cancel.is_cancelled() {
                break;
            }
        }

        self.set_state(SchedulerState::Draining);
        self.set_state(SchedulerState::Stopped);
        tracing::info!(cycles = self.cycles_started(), "Scheduler stopped");
    }

    /// Run exactly one cycle and return its summary.
    ///
    /// A failure to list repositories is reported in the summary; nothing in a
    /// cycle is fatal to the caller.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleSummary {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        self.set_state(SchedulerState::Running { cycle });

        let mut summary = CycleSummary {
            cycle,
            ..Default::default()
        };

        let names: Vec<String> = match repositories::find_all(self.monitor.db()).await {
            Ok(repos) => repos.into_iter().map(|r| r.name).collect(),
            Err(e) => {
                tracing::warn!(cycle, error = %e, "Failed to list repositories");
                summary.list_error = Some(short_error_message(&e));
                summary.elapsed = started.elapsed();
                self.finish_cycle(&summary);
                return summary;
            }
        };

        summary.repositories = names.len();
        emit(
            self.on_progress.as_ref(),
            SyncProgress::CycleStarted {
                cycle,
                repositories: names.len(),
            },
        );

        if !names.is_empty() {
            let handles = self.spawn_units(names, cancel);

            let join = self.join_units(handles, &mut summary);
            tokio::pin!(join);
            tokio::select! {
                _ = &mut join => {}
                _ = cancel.cancelled() => {
                    self.set_state(SchedulerState::Draining);
                    tracing::info!(cycle, "Shutdown requested, draining in-flight repositories");
                    join.await;
                }
            }
        }

        summary.elapsed = started.elapsed();
        self.finish_cycle(&summary);
        summary
    }

    fn finish_cycle(&self, summary: &CycleSummary) {
        emit(
            self.on_progress.as_ref(),
            SyncProgress::CycleComplete {
                summary: summary.clone(),
            },
        );
        self.state.send_if_modified(|state| {
            if matches!(state, SchedulerState::Running { .. }) {
                *state = SchedulerState::Idle;
                true
            } else {
                false
            }
        });
    }

    fn spawn_units(
        &self,
        names: Vec<String>,
        cancel: &CancellationToken,
    ) -> Vec<(String, JoinHandle<SyncOutcome>)> {
        let concurrency = self.monitor.options().concurrency.clamp(1, names.len());
        let semaphore = Arc::new(Semaphore::new(concurrency));

        names
            .into_iter()
            .map(|name| {
                let monitor = self.monitor.clone();
                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();
                let task_name = name.clone();

                let handle = tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return SyncOutcome::Cancelled,
                    };
                    monitor.sync(&task_name, &cancel).await
                });

                (name, handle)
            })
            .collect()
    }

    async fn join_units(
        &self,
        handles: Vec<(String, JoinHandle<SyncOutcome>)>,
        summary: &mut CycleSummary,
    ) {
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => SyncOutcome::Failed(SyncError::Panicked {
                    message: panic_message(e),
                }),
            };

            let event = match &outcome {
                SyncOutcome::Synced { fetched, inserted } => Some(SyncProgress::RepositorySynced {
                    name: name.clone(),
                    fetched: *fetched,
                    inserted: *inserted,
                }),
                SyncOutcome::UpToDate => Some(SyncProgress::RepositoryUpToDate { name: name.clone() }),
                SyncOutcome::Skipped => Some(SyncProgress::RepositorySkipped { name: name.clone() }),
                SyncOutcome::Failed(e) => {
                    tracing::warn!(repo = %name, error = %e, "Repository sync failed");
                    Some(SyncProgress::RepositoryFailed {
                        name: name.clone(),
                        error: short_error_message(e),
                    })
                }
                SyncOutcome::Cancelled => None,
            };
            if let Some(event) = event {
                emit(self.on_progress.as_ref(), event);
            }

            summary.record(RepositorySync { name, outcome });
        }
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let panic = err.into_panic();
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_summary(summary: &CycleSummary) {
    if let Some(error) = &summary.list_error {
        tracing::warn!(cycle = summary.cycle, error = %error, "Cycle skipped");
        return;
    }
    if summary.repositories == 0 {
        tracing::debug!(cycle = summary.cycle, "No repositories tracked");
        return;
    }
    tracing::info!(
        cycle = summary.cycle,
        repositories = summary.repositories,
        synced = summary.synced,
        up_to_date = summary.up_to_date,
        skipped = summary.skipped,
        failed = summary.failed(),
        cancelled = summary.cancelled,
        commits_added = summary.commits_added,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Cycle complete"
    );
}
