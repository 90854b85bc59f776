//! GitHub implementation of the upstream fetch client.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitHub API operations
//! - [`types`] - Wire types for the endpoints the monitor calls
//! - [`client`] - The HTTP client and pagination
//! - [`convert`] - Conversion to platform types
//!
//! ```ignore
//! use gmonitor::github::{GitHubClient, GITHUB_API_URL, DEFAULT_HTTP_TIMEOUT};
//!
//! let client = GitHubClient::new(GITHUB_API_URL, token, DEFAULT_HTTP_TIMEOUT)?;
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{
    DEFAULT_HTTP_TIMEOUT, DEFAULT_MAX_PAGES, GITHUB_API_URL, GITHUB_API_VERSION, GitHubClient,
    parse_next_link,
};
pub use convert::{to_remote_commit, to_remote_repository};
pub use error::GitHubError;
pub use types::{GitHubCommit, GitHubCommitDetail, GitHubRepository, GitHubSignature, GitHubUser};
