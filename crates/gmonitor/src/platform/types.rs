use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::Result;

/// Repository metadata as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    /// Full name, `owner/name`.
    pub full_name: String,
    pub description: Option<String>,
    /// Web URL.
    pub url: String,
    pub language: Option<String>,
    pub forks: u32,
    pub stars: u32,
    pub open_issues: u32,
    pub watchers: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single commit as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommit {
    /// Commit SHA.
    pub hash: String,
    pub author: String,
    pub message: String,
    /// Web URL of the commit.
    pub url: String,
    pub committed_at: DateTime<Utc>,
}

/// Upstream source of repository metadata and commit history.
///
/// Implementations own their credential and transport; callers only name the
/// repository. Methods never retry, and a timeout is reported as
/// [`FetchError::Transport`](super::FetchError::Transport).
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Fetch current metadata for `name` (`owner/name`).
    async fn fetch_repository(&self, name: &str) -> Result<RemoteRepository>;

    /// Fetch commits of `name` created at or after `since`.
    async fn fetch_commits(&self, name: &str, since: DateTime<Utc>) -> Result<Vec<RemoteCommit>>;
}
