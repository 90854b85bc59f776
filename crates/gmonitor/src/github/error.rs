//! Error types for GitHub API operations.

use thiserror::Error;

use crate::platform::FetchError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned a non-success status.
    #[error("API error ({status}) for {url}")]
    Api { status: u16, url: String },

    /// A field the client relies on was missing from an otherwise valid payload.
    #[error("Incomplete payload: {0}")]
    Incomplete(String),

    /// Pagination hit the page cap with more pages still on offer.
    #[error("Commit listing exceeds {pages} pages")]
    Truncated { pages: u32 },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<GitHubError> for FetchError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Http(message) | GitHubError::Config(message) => {
                FetchError::Transport { message }
            }
            GitHubError::Json(e) => FetchError::Decode {
                message: e.to_string(),
            },
            GitHubError::Incomplete(message) => FetchError::Decode { message },
            GitHubError::Api { status, url } => FetchError::Status { status, url },
            GitHubError::Truncated { pages } => FetchError::Truncated { pages },
        }
    }
}
