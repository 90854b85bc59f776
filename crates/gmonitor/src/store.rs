//! Durable storage for tracked repositories and their commits.
//!
//! Repositories are created by the tracker and read by the sync engine; commits
//! are only ever written through [`commits::persist_commits`], which makes every
//! insert path duplicate tolerant.

pub mod commits;
mod errors;
pub mod query;
pub mod repositories;

pub use commits::{insert_commit, latest_commit_at, persist_commits};
pub use errors::{Result, StoreError};
pub use query::{AuthorCount, PaginatedResult, Pagination};
