//! Server configuration

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

/// Server configuration loaded from environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Root of the archetype data directories
    pub data_dir: PathBuf,
    /// SQLite database holding accounts
    pub accounts_db: String,
    /// Settings handed to every World task
    pub world: WorldConfig,
    /// Upper bound on the shutdown drain
    pub shutdown_timeout: Duration,
}

/// Per-world settings
#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub tick: Duration,
    pub max_players: usize,
    pub location_width: i32,
    pub location_height: i32,
    /// Unload a location after it has been empty this long. `None` keeps it.
    pub location_idle: Option<Duration>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            max_players: 8,
            location_width: 60,
            location_height: 60,
            location_idle: None,
        }
    }
}

impl WorldConfig {
    /// Reject settings a World task cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.tick.is_zero(), "DELVER_TICK_MS must be greater than zero");
        ensure!(self.max_players > 0, "DELVER_MAX_PLAYERS must be greater than zero");
        ensure!(
            self.location_width > 0 && self.location_height > 0,
            "DELVER_LOCATION_WIDTH and DELVER_LOCATION_HEIGHT must be positive"
        );
        Ok(())
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{name} must be a valid number"))
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let location_idle = match env::var("DELVER_LOCATION_IDLE_SECS") {
            Ok(secs) => Some(Duration::from_secs(
                secs.parse()
                    .context("DELVER_LOCATION_IDLE_SECS must be a valid number")?,
            )),
            Err(_) => None,
        };

        let config = Self {
            data_dir: env::var("DELVER_DATA_DIR")
                .unwrap_or_else(|_| "./data/archetypes".to_string())
                .into(),
            accounts_db: env::var("DELVER_ACCOUNTS_DB")
                .unwrap_or_else(|_| "./data/accounts.db".to_string()),
            world: WorldConfig {
                tick: Duration::from_millis(parse_var("DELVER_TICK_MS", "100")?),
                max_players: parse_var("DELVER_MAX_PLAYERS", "8")?,
                location_width: parse_var("DELVER_LOCATION_WIDTH", "60")?,
                location_height: parse_var("DELVER_LOCATION_HEIGHT", "60")?,
                location_idle,
            },
            shutdown_timeout: Duration::from_secs(parse_var("DELVER_SHUTDOWN_TIMEOUT_SECS", "10")?),
        };
        config
            .world
            .validate()
            .context("invalid world configuration")?;
        Ok(config)
    }
}
