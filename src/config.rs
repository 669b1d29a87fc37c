// Session configuration: command-line flags (with environment fallbacks),
// the server URL saved from a previous run, and logging setup.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use crate::api::Endpoint;
use crate::poll::PollLoop;

/// Server used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Port the bot's admin service listens on when only a host is given.
pub const DEFAULT_PORT: u16 = 5000;

const SAVED_SERVER_FILE: &str = ".mt5admin_server";

/// Remote administration console for the MT5 trading bot.
#[derive(Parser, Debug, Clone)]
#[command(name = "mt5admin", version)]
pub struct Cli {
    /// Base URL of the bot's admin service.
    #[arg(long, env = "MT5ADMIN_SERVER_URL")]
    pub server_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Seconds between realtime account refreshes.
    #[arg(long, default_value_t = 30)]
    pub poll_interval_secs: u64,

    /// Seconds to wait after a failed refresh.
    #[arg(long, default_value_t = 3)]
    pub failure_backoff_secs: u64,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, env = "MT5ADMIN_LOG", default_value = "warn")]
    pub log_level: String,
}

/// Everything a session needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: Endpoint,
    pub poll: PollLoop,
    pub log_level: String,
}

impl Settings {
    /// Flag or environment wins over the saved server, which wins over the
    /// built-in default.
    pub fn resolve(cli: Cli, saved_server: Option<String>) -> Self {
        let server = cli
            .server_url
            .and_then(|s| normalize_server(&s))
            .or(saved_server)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        Settings {
            endpoint: Endpoint::new(server, Duration::from_secs(cli.timeout_secs)),
            poll: PollLoop::new(
                Duration::from_secs(cli.poll_interval_secs),
                Duration::from_secs(cli.failure_backoff_secs),
            ),
            log_level: cli.log_level,
        }
    }
}

/// Turn operator input into a base URL. Full URLs pass through; `host:port`
/// gets a scheme; a bare host or IP also gets the default port. Blank input
/// yields `None`.
pub fn normalize_server(input: &str) -> Option<String> {
    let input = input.trim().trim_end_matches('/');
    if input.is_empty() {
        return None;
    }
    if input.starts_with("http://") || input.starts_with("https://") {
        Some(input.to_string())
    } else if input.contains(':') {
        Some(format!("http://{}", input))
    } else {
        Some(format!("http://{}:{}", input, DEFAULT_PORT))
    }
}

/// File holding the last server the operator switched to.
#[derive(Debug, Clone)]
pub struct ServerStore {
    path: PathBuf,
}

impl ServerStore {
    /// Store in the user's home directory, or the working directory when no
    /// home can be found.
    pub fn in_home() -> Self {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        ServerStore::at(dir.join(SAVED_SERVER_FILE))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        ServerStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved server URL, if a readable non-empty file exists.
    pub fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => normalize_server(&data),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no saved server");
                None
            }
        }
    }

    pub fn save(&self, server_url: &str) -> Result<()> {
        std::fs::write(&self.path, server_url)
            .with_context(|| format!("Failed to save server URL to {}", self.path.display()))
    }
}

/// Install the stderr tracing subscriber. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
