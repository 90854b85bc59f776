//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gmonitor::connect_and_migrate;
use gmonitor::entity::repository::Model as RepositoryModel;
use gmonitor::platform::{self, FetchClient, FetchError, RemoteCommit, RemoteRepository};
use gmonitor::store::repositories;
use sea_orm::DatabaseConnection;

/// Upper bound for any single test operation; exceeding it means a hang.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// In-memory stand-in for GitHub.
#[derive(Default)]
pub struct FakeGitHub {
    repositories: Mutex<HashMap<String, RemoteRepository>>,
    commits: Mutex<HashMap<String, Vec<RemoteCommit>>>,
    failing: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<(String, DateTime<Utc>)>>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(self, name: &str) -> Self {
        self.repositories
            .lock()
            .unwrap()
            .insert(name.to_string(), remote_repository(name));
        self
    }

    pub fn set_commits(&self, name: &str, commits: Vec<RemoteCommit>) {
        self.commits
            .lock()
            .unwrap()
            .insert(name.to_string(), commits);
    }

    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().push(name.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Every `(name, since)` passed to `fetch_commits`, in call order.
    pub fn calls(&self) -> Vec<(String, DateTime<Utc>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn since_for(&self, name: &str) -> Vec<DateTime<Utc>> {
        self.calls()
            .into_iter()
            .filter(|(n, _)| n == name)
            .map(|(_, since)| since)
            .collect()
    }
}

#[async_trait]
impl FetchClient for FakeGitHub {
    async fn fetch_repository(&self, name: &str) -> platform::Result<RemoteRepository> {
        self.repositories
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| FetchError::status(404, format!("https://api.github.com/repos/{name}")))
    }

    async fn fetch_commits(
        &self,
        name: &str,
        since: DateTime<Utc>,
    ) -> platform::Result<Vec<RemoteCommit>> {
        self.calls.lock().unwrap().push((name.to_string(), since));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().iter().any(|n| n == name) {
            return Err(FetchError::transport("connection reset by peer"));
        }

        Ok(self
            .commits
            .lock()
            .unwrap()
            .get(name)
            .map(|commits| {
                commits
                    .iter()
                    .filter(|c| c.committed_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn remote_repository(name: &str) -> RemoteRepository {
    RemoteRepository {
        full_name: name.to_string(),
        description: Some(format!("{name} description")),
        url: format!("https://github.com/{name}"),
        language: Some("Rust".to_string()),
        forks: 3,
        stars: 42,
        open_issues: 1,
        watchers: 42,
        created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    }
}

pub fn commit(hash: &str, author: &str, at: DateTime<Utc>) -> RemoteCommit {
    RemoteCommit {
        hash: hash.to_string(),
        author: author.to_string(),
        message: format!("commit {hash}"),
        url: format!("https://github.com/acme/widgets/commit/{hash}"),
        committed_at: at,
    }
}

/// `2024-03-01T12:00:00Z` plus `minutes`.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + chrono::TimeDelta::minutes(minutes)
}

pub async fn setup_db() -> Arc<DatabaseConnection> {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    Arc::new(db)
}

/// Store a repository row directly, bypassing the tracker.
pub async fn insert_repository(db: &DatabaseConnection, name: &str) -> RepositoryModel {
    repositories::insert(db, remote_repository(name).to_active_model())
        .await
        .expect("insert repository")
}
