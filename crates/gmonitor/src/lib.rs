//! gmonitor - keeps a local store of GitHub repository metadata and commit
//! history in sync.
//!
//! A [`sync::Worker`] polls every tracked repository on a fixed interval,
//! fetching only commits newer than that repository's latest stored commit.
//! Repositories are added through [`tracker::track_repository`] and read back
//! through the [`server`] API.
//!
//! # Features
//!
//! - `sqlite` (default) / `postgres` - database backends.
//! - `migrate` (default) - schema migrations and [`connect_and_migrate`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gmonitor::{connect_and_migrate, github::GitHubClient, sync::{Monitor, SyncOptions, Worker}};
//!
//! let db = connect_and_migrate("sqlite://gmonitor.db?mode=rwc").await?;
//! let client = GitHubClient::new(GITHUB_API_URL, token, DEFAULT_HTTP_TIMEOUT)?;
//! let worker = Worker::new(Monitor::new(Arc::new(db), Arc::new(client), SyncOptions::default()));
//! worker.run_forever(cancel).await;
//! ```

pub mod cache;
pub mod db;
pub mod entity;
pub mod github;
pub mod http;
pub mod platform;
pub mod server;
pub mod store;
pub mod sync;
pub mod tracker;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use platform::{FetchClient, FetchError, RemoteCommit, RemoteRepository};
pub use store::StoreError;
pub use tracker::TrackError;
