use gmonitor::sync::{ProgressCallback, SyncProgress};

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn handle(event: SyncProgress) {
        match event {
            SyncProgress::CycleStarted {
                cycle,
                repositories,
            } => {
                tracing::debug!(cycle, repositories, "Cycle started");
            }

            SyncProgress::RepositorySynced {
                name,
                fetched,
                inserted,
            } => {
                tracing::debug!(repo = %name, fetched, inserted, "Repository synced");
            }

            SyncProgress::RepositoryUpToDate { name } => {
                tracing::debug!(repo = %name, "Repository up to date");
            }

            SyncProgress::RepositorySkipped { name } => {
                tracing::debug!(repo = %name, "Repository skipped");
            }

            SyncProgress::RepositoryFailed { name, error } => {
                tracing::debug!(repo = %name, error = %error, "Repository failed");
            }

            SyncProgress::CycleComplete { summary } => {
                tracing::debug!(
                    cycle = summary.cycle,
                    commits_added = summary.commits_added,
                    "Cycle finished"
                );
            }

            _ => {}
        }
    }

    pub fn callback() -> ProgressCallback {
        Box::new(Self::handle)
    }
}
