//! Configuration file support for gmonitor.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables: `GMONITOR_<SECTION>__<KEY>` (e.g.
//!    `GMONITOR_GITHUB__TOKEN`), then the legacy `GITHUB_TOKEN`, `DB_DSN` and
//!    `SERVER_PORT`
//! 3. Config file (./gmonitor.toml, then ~/.config/gmonitor/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/gmonitor/gmonitor.db`
//! on Linux (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "postgres://localhost/gmonitor"
//!
//! [github]
//! token = "ghp_..."
//! timeout_secs = 10
//! max_pages = 100
//!
//! [sync]
//! poll_interval_secs = 60
//! fetch_timeout_secs = 30
//! concurrency = 20
//! grace_secs = 1
//! epoch = "2024-01-01T00:00:00Z"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [cache]
//! ttl_secs = 300
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use config::builder::DefaultState;
use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use gmonitor::cache::{DEFAULT_CACHE_TTL, DEFAULT_MAX_ENTRIES};
use gmonitor::github::{DEFAULT_HTTP_TIMEOUT, DEFAULT_MAX_PAGES, GITHUB_API_URL};
use gmonitor::sync::{
    DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT, DEFAULT_GRACE_SECS, DEFAULT_POLL_INTERVAL,
    SyncOptions, default_epoch,
};
use serde::Deserialize;

const APP_NAME: &str = "gmonitor";

/// Unprefixed variables still honoured, with the key they set and the
/// prefixed variable that takes precedence over them.
const LEGACY_ENV: [(&str, &str, &str); 3] = [
    ("GITHUB_TOKEN", "github.token", "GMONITOR_GITHUB__TOKEN"),
    ("DB_DSN", "database.url", "GMONITOR_DATABASE__URL"),
    ("SERVER_PORT", "server.port", "GMONITOR_SERVER__PORT"),
];

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub sync: SyncConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL (`sqlite://` or `postgres://`).
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API token. Optional; public repositories work without one.
    pub token: Option<String>,
    pub api_url: String,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    /// Maximum commit pages followed per fetch.
    pub max_pages: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: GITHUB_API_URL.to_string(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT.as_secs(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Sync scheduler configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub concurrency: usize,
    pub grace_secs: i64,
    /// Lower bound for repositories with no stored commits.
    pub epoch: Option<DateTime<Utc>>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            concurrency: DEFAULT_CONCURRENCY,
            grace_secs: DEFAULT_GRACE_SECS,
            epoch: None,
        }
    }
}

/// API server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl Config {
    /// Load configuration from files and the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` if a config file is malformed or a value has the
    /// wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from(format!("{APP_NAME}.toml"));
        if local_config.exists() {
            tracing::debug!("Loading config from ./{APP_NAME}.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("GMONITOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder = apply_legacy_env(builder, |name| std::env::var(name).ok())?;

        builder.build()?.try_deserialize()
    }

    /// The configured database URL, or a SQLite file in the state directory.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join(format!("{APP_NAME}.db"));
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn github_timeout(&self) -> Duration {
        Duration::from_secs(self.github.timeout_secs.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Scheduler options derived from the `[sync]` section.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            poll_interval: Duration::from_secs(self.sync.poll_interval_secs.max(1)),
            concurrency: self.sync.concurrency.max(1),
            fetch_timeout: Duration::from_secs(self.sync.fetch_timeout_secs.max(1)),
            grace: TimeDelta::seconds(self.sync.grace_secs.max(0)),
            epoch: self.sync.epoch.unwrap_or_else(default_epoch),
            ..SyncOptions::default()
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/gmonitor` or `~/.local/state/gmonitor`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

/// Map legacy variables onto their keys unless the prefixed form is set.
fn apply_legacy_env<F>(
    mut builder: config::ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<config::ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (legacy, key, prefixed) in LEGACY_ENV {
        if lookup(prefixed).is_some() {
            continue;
        }
        if let Some(value) = lookup(legacy).filter(|v| !v.is_empty()) {
            builder = builder.set_override(key, value)?;
        }
    }
    Ok(builder)
}
