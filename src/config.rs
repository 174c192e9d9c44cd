//! Configuration loader for the `smartaqua-alerts` trigger service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::{env, time::Duration};

use anyhow::{anyhow, Result};

use crate::channels::EXPO_PUSH_URL;

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// TCP port the HTTP server binds on all interfaces.
    pub listen_port: u16,

    /// Minimum spacing between two alerts of the same sensor kind.
    pub alert_cooldown: Duration,

    /// Upper bound for a single channel delivery.
    pub channel_timeout: Duration,

    /// Expo push API endpoint.
    pub push_api_url: String,

    /// Optional Expo access token for authenticated push.
    pub push_access_token: Option<String>,

    /// Email relay endpoint; email alerts are not sent when unset.
    pub email_relay_url: Option<String>,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
/// - `ALERT_COOLDOWN_SECS` – per-kind alert cooldown (default: 180)
/// - `CHANNEL_TIMEOUT_SECS` – per-delivery timeout (default: 10)
/// - `PUSH_API_URL` – push endpoint (default: Expo push API)
/// - `PUSH_ACCESS_TOKEN` – bearer token for the push endpoint
/// - `EMAIL_RELAY_URL` – email relay endpoint
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env!("DB_POOL_MAX", u32, 5);
    let listen_port = parse_env!("LISTEN_PORT", u16, 8080);
    let cooldown_secs = parse_env!("ALERT_COOLDOWN_SECS", u64, 180);
    let timeout_secs = parse_env!("CHANNEL_TIMEOUT_SECS", u64, 10);

    if timeout_secs == 0 {
        return Err(anyhow!("CHANNEL_TIMEOUT_SECS must be greater than zero"));
    }

    let push_api_url = optional_env("PUSH_API_URL").unwrap_or_else(|| EXPO_PUSH_URL.to_string());

    Ok(Config {
        db_url,
        db_pool_max,
        listen_port,
        alert_cooldown: Duration::from_secs(cooldown_secs),
        channel_timeout: Duration::from_secs(timeout_secs),
        push_api_url,
        push_access_token: optional_env("PUSH_ACCESS_TOKEN"),
        email_relay_url: optional_env("EMAIL_RELAY_URL"),
    })
}

/// Unset and blank are treated the same.
fn optional_env(var_name: &str) -> Option<String> {
    env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Replace the password component of a connection URL with `****`.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // `postgres://host@...` has its only colon in the scheme.
            if !db_url[colon_pos..].starts_with("://") {
                return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
            }
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password and push access token.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL         : {}", mask_db_url(&self.db_url));
        tracing::info!("  DB_POOL_MAX          : {}", self.db_pool_max);
        tracing::info!("  LISTEN_PORT          : {}", self.listen_port);
        tracing::info!("  ALERT_COOLDOWN_SECS  : {}", self.alert_cooldown.as_secs());
        tracing::info!("  CHANNEL_TIMEOUT_SECS : {}", self.channel_timeout.as_secs());
        tracing::info!("  PUSH_API_URL         : {}", self.push_api_url);
        tracing::info!(
            "  PUSH_ACCESS_TOKEN    : {}",
            if self.push_access_token.is_some() { "****" } else { "(unset)" }
        );
        tracing::info!(
            "  EMAIL_RELAY_URL      : {}",
            self.email_relay_url.as_deref().unwrap_or("(unset, email alerts disabled)")
        );
    }
}
