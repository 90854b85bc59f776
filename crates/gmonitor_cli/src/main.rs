//! gmonitor CLI - runs the repository sync daemon and its maintenance commands.

mod commands;
mod config;
mod progress;
mod shutdown;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gmonitor")]
#[command(version)]
#[command(about = "Keeps a local copy of GitHub repository metadata and commits in sync")]
#[command(
    long_about = "gmonitor tracks a set of GitHub repositories. It polls each one on a fixed \
interval, storing new commits past the latest one already stored, and serves the \
collected data over a small JSON API."
)]
#[command(after_long_help = r#"EXAMPLES
    Start tracking a repository and pull its history:
        $ gmonitor track rust-lang/rust --since 2024-01-01T00:00:00Z

    Run the scheduler and API:
        $ gmonitor serve --port 8080

    Run a single sync cycle:
        $ gmonitor sync

CONFIGURATION
    gmonitor reads configuration from:
      1. ~/.config/gmonitor/config.toml (or $XDG_CONFIG_HOME/gmonitor/config.toml)
      2. ./gmonitor.toml
      3. Environment variables (GMONITOR_<SECTION>__<KEY>, e.g. GMONITOR_GITHUB__TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GMONITOR_DATABASE__URL    Database connection string (default: ~/.local/state/gmonitor/gmonitor.db)
    GMONITOR_GITHUB__TOKEN    GitHub personal access token
    GITHUB_TOKEN, DB_DSN, SERVER_PORT
                              Accepted when the GMONITOR_ form is unset
"#)]
struct Cli {
    /// Database URL (overrides configuration)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync scheduler and the API until interrupted
    Serve {
        /// Address to listen on
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Seconds between sync cycles
        #[arg(short, long)]
        interval: Option<u64>,
        /// Maximum repositories synced concurrently
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Run one sync cycle over all tracked repositories
    Sync {
        /// Maximum repositories synced concurrently
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Start tracking a repository and pull its commits
    Track {
        /// Repository in owner/name form
        name: String,
        /// Only pull commits after this time (RFC 3339)
        #[arg(short, long)]
        since: Option<DateTime<Utc>>,
    },
    /// Re-fetch the metadata of a tracked repository
    Refresh {
        /// Repository in owner/name form
        name: String,
    },
    /// Stop tracking a repository (its commits are kept)
    Untrack {
        /// Repository in owner/name form
        name: String,
    },
    /// List tracked repositories
    List,
    /// Run database migrations
    #[cfg(feature = "migrate")]
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[cfg(feature = "migrate")]
#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("gmonitor=info,gmonitor_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = config::Config::load()?;

    if let Some(url) = cli.database_url {
        config.database.url = Some(url);
    }
    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set GMONITOR_DATABASE__URL")?;
    ensure_sqlite_parent_dir(&database_url)?;

    let cancel = CancellationToken::new();
    shutdown::setup_shutdown_handler(cancel.clone());

    match cli.command {
        Commands::Serve {
            host,
            port,
            interval,
            concurrency,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(interval) = interval {
                config.sync.poll_interval_secs = interval;
            }
            if let Some(concurrency) = concurrency {
                config.sync.concurrency = concurrency;
            }
            commands::serve::handle_serve(&config, &database_url, cancel).await?;
        }
        Commands::Sync { concurrency } => {
            if let Some(concurrency) = concurrency {
                config.sync.concurrency = concurrency;
            }
            commands::sync::handle_sync(&config, &database_url, cancel).await?;
        }
        Commands::Track { name, since } => {
            commands::track::handle_track(&config, &database_url, &name, since).await?;
        }
        Commands::Refresh { name } => {
            commands::track::handle_refresh(&config, &database_url, &name).await?;
        }
        Commands::Untrack { name } => {
            commands::track::handle_untrack(&database_url, &name).await?;
        }
        Commands::List => {
            commands::track::handle_list(&database_url).await?;
        }
        #[cfg(feature = "migrate")]
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
    }

    Ok(())
}

/// Create the parent directory of a file-backed SQLite database.
fn ensure_sqlite_parent_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
