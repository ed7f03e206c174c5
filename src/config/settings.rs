use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::timeouts::{
    DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_MUTE_RELEASE_TIMEOUT_SECONDS,
    DEFAULT_MUTE_SWEEP_INTERVAL_SECONDS,
};

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: String,
    pub database_url: String,
    pub database_max_connections: u32,
    /// Register commands in this guild only (faster iteration while developing)
    pub guild_id: Option<u64>,
    /// Period between two expiry sweeps
    pub mute_sweep_interval: Duration,
    /// Bound on the platform calls made while releasing one expired mute
    pub mute_release_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, String> {
        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| "DISCORD_TOKEN environment variable not set")?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable not set")?;

        let database_max_connections =
            parse_var("DATABASE_MAX_CONNECTIONS")?.unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS);

        let guild_id = env::var("GUILD_ID")
            .ok()
            .and_then(|s| s.parse::<u64>().ok());

        let mute_sweep_interval = positive_seconds(
            "MUTE_SWEEP_INTERVAL_SECONDS",
            parse_var("MUTE_SWEEP_INTERVAL_SECONDS")?,
            DEFAULT_MUTE_SWEEP_INTERVAL_SECONDS,
        )?;

        // A zero timeout would release every mute without ever revoking the role
        let mute_release_timeout = positive_seconds(
            "MUTE_RELEASE_TIMEOUT_SECONDS",
            parse_var("MUTE_RELEASE_TIMEOUT_SECONDS")?,
            DEFAULT_MUTE_RELEASE_TIMEOUT_SECONDS,
        )?;

        Ok(Self {
            discord_token,
            database_url,
            database_max_connections,
            guild_id,
            mute_sweep_interval,
            mute_release_timeout,
        })
    }
}

/// Parse an optional numeric variable. Set-but-invalid is an error rather than a silent default.
fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{} must be a number, got {:?}", name, raw)),
        _ => Ok(None),
    }
}

fn positive_seconds(name: &str, value: Option<u64>, default: u64) -> Result<Duration, String> {
    match value.unwrap_or(default) {
        0 => Err(format!("{} must be greater than zero", name)),
        secs => Ok(Duration::from_secs(secs)),
    }
}
