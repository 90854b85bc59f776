//! Platform-agnostic trait for upstream fetch clients.
//!
//! The sync engine only depends on [`FetchClient`]; the GitHub implementation
//! lives in [`crate::github`].
//!
//! # Example
//!
//! ```ignore
//! use gmonitor::platform::FetchClient;
//!
//! async fn newest<C: FetchClient>(client: &C) -> Result<(), FetchError> {
//!     let since = chrono::Utc::now() - chrono::Duration::days(1);
//!     for commit in client.fetch_commits("acme/widgets", since).await? {
//!         println!("{} {}", commit.hash, commit.author);
//!     }
//!     Ok(())
//! }
//! ```

mod convert;
mod errors;
mod types;

pub use errors::{FetchError, Result, short_error_message};
pub use types::{FetchClient, RemoteCommit, RemoteRepository};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_transport() {
        let err = FetchError::transport("connection refused");
        assert!(err.to_string().contains("Transport error"));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_fetch_error_status() {
        let err = FetchError::status(502, "https://api.github.com/repos/a/b");
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("repos/a/b"));
        assert_eq!(err.kind(), "status");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_fetch_error_not_found_is_status() {
        let err = FetchError::status(404, "https://api.github.com/repos/a/b");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_fetch_error_decode() {
        let err = FetchError::decode("missing field `sha`");
        assert!(err.to_string().contains("Malformed response"));
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn test_short_error_message_takes_first_line() {
        let err = FetchError::decode("line one\nline two");
        assert_eq!(short_error_message(&err), "Malformed response: line one");
    }
}
