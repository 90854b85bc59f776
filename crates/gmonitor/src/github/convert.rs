//! Model conversion from GitHub API types to platform types.

use crate::platform::{RemoteCommit, RemoteRepository};

use super::error::GitHubError;
use super::types::{GitHubCommit, GitHubRepository};

/// Fallback author name when the payload carries none.
const UNKNOWN_AUTHOR: &str = "unknown";

/// Convert a GitHub repository to a platform-agnostic [`RemoteRepository`].
pub fn to_remote_repository(repo: GitHubRepository) -> RemoteRepository {
    RemoteRepository {
        full_name: repo.full_name,
        description: repo.description,
        url: repo.html_url,
        language: repo.language,
        forks: repo.forks_count,
        stars: repo.stargazers_count,
        open_issues: repo.open_issues_count,
        watchers: repo.watchers_count,
        created_at: repo.created_at,
        updated_at: repo.updated_at,
    }
}

/// Convert a GitHub commit to a [`RemoteCommit`].
///
/// The author is the git author name, falling back to the committer and then
/// the linked account login. The date is the author date, falling back to the
/// committer date; a commit with neither is rejected.
pub fn to_remote_commit(commit: GitHubCommit) -> Result<RemoteCommit, GitHubError> {
    let detail = commit.commit;

    let author = detail
        .author
        .as_ref()
        .map(|s| s.name.clone())
        .filter(|name| !name.is_empty())
        .or_else(|| detail.committer.as_ref().map(|s| s.name.clone()))
        .filter(|name| !name.is_empty())
        .or_else(|| commit.author.map(|u| u.login))
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let committed_at = detail
        .author
        .as_ref()
        .and_then(|s| s.date)
        .or_else(|| detail.committer.as_ref().and_then(|s| s.date))
        .ok_or_else(|| GitHubError::Incomplete(format!("commit {} has no date", commit.sha)))?;

    Ok(RemoteCommit {
        hash: commit.sha,
        author,
        message: detail.message,
        url: commit.html_url,
        committed_at,
    })
}
