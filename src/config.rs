//! Configuration loader for the `loadwatch` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Dashboard settings that users edit at runtime
//! (thresholds, tariff, load profiles) are not here; they live in the config
//! store file named by `LOADWATCH_CONFIG_FILE`.
//!
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

/// Parse an optional environment variable into `$ty`, falling back to a default.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// JSON document holding thresholds, tariff and load profiles.
    pub config_file: PathBuf,

    /// CSV file receiving one row per evaluated tick.
    pub data_log_file: PathBuf,

    /// Dashboard login.
    pub username: String,
    pub password: String,

    /// Consecutive failures before the login locks.
    pub max_login_attempts: u32,

    /// Lockout duration in seconds.
    pub lockout_secs: u32,

    /// Simulated hours per wall-clock hour.
    pub time_scale: f64,

    /// Points kept per chart series.
    pub max_data_points: u32,

    /// Entries kept in each session's alert history.
    pub max_alerts: u32,

    /// Fixed seed for the sample generator; random when unset.
    pub sim_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            config_file: PathBuf::from("load_config.json"),
            data_log_file: PathBuf::from("load_data_log.csv"),
            username: "admin".to_string(),
            password: "password".to_string(),
            max_login_attempts: 3,
            lockout_secs: 300,
            time_scale: 1.0,
            max_data_points: 200,
            max_alerts: 200,
            sim_seed: None,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// All variables are optional:
/// - `LOADWATCH_BIND_ADDR` – listen address (default: `0.0.0.0:8080`)
/// - `LOADWATCH_CONFIG_FILE` – settings document (default: `load_config.json`)
/// - `LOADWATCH_DATA_LOG_FILE` – tick log (default: `load_data_log.csv`)
/// - `LOADWATCH_USERNAME` / `LOADWATCH_PASSWORD` – login (default: `admin` / `password`)
/// - `LOADWATCH_MAX_LOGIN_ATTEMPTS` – failures before lockout (default: 3)
/// - `LOADWATCH_LOCKOUT_SECS` – lockout duration (default: 300)
/// - `LOADWATCH_TIME_SCALE` – simulated hours per real hour (default: 1.0)
/// - `LOADWATCH_MAX_DATA_POINTS` – chart series length (default: 200)
/// - `LOADWATCH_MAX_ALERTS` – alert history length (default: 200)
/// - `LOADWATCH_SIM_SEED` – fixed generator seed (default: random)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();

    let bind_addr = parse_env!("LOADWATCH_BIND_ADDR", SocketAddr, defaults.bind_addr);
    let config_file = PathBuf::from(env_or!(
        "LOADWATCH_CONFIG_FILE",
        defaults.config_file.display()
    ));
    let data_log_file = PathBuf::from(env_or!(
        "LOADWATCH_DATA_LOG_FILE",
        defaults.data_log_file.display()
    ));
    let username = env_or!("LOADWATCH_USERNAME", defaults.username);
    let password = env_or!("LOADWATCH_PASSWORD", defaults.password);
    let max_login_attempts = parse_env!(
        "LOADWATCH_MAX_LOGIN_ATTEMPTS",
        u32,
        defaults.max_login_attempts
    );
    let lockout_secs = parse_env!("LOADWATCH_LOCKOUT_SECS", u32, defaults.lockout_secs);
    let time_scale = parse_env!("LOADWATCH_TIME_SCALE", f64, defaults.time_scale);
    let max_data_points = parse_env!("LOADWATCH_MAX_DATA_POINTS", u32, defaults.max_data_points);
    let max_alerts = parse_env!("LOADWATCH_MAX_ALERTS", u32, defaults.max_alerts);
    let sim_seed = env::var("LOADWATCH_SIM_SEED")
        .ok()
        .map(|v| v.parse::<u64>())
        .transpose()
        .map_err(|e| anyhow!("Invalid LOADWATCH_SIM_SEED: {}", e))?;

    let cfg = Config {
        bind_addr,
        config_file,
        data_log_file,
        username,
        password,
        max_login_attempts,
        lockout_secs,
        time_scale,
        max_data_points,
        max_alerts,
        sim_seed,
    };
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Reject values that would make the service misbehave.
    pub fn validate(&self) -> Result<()> {
        // ---
        if !(self.time_scale.is_finite() && self.time_scale > 0.0) {
            bail!("LOADWATCH_TIME_SCALE must be positive, got {}", self.time_scale);
        }
        if self.max_login_attempts == 0 {
            bail!("LOADWATCH_MAX_LOGIN_ATTEMPTS must be at least 1");
        }
        if self.max_data_points == 0 || self.max_alerts == 0 {
            bail!("LOADWATCH_MAX_DATA_POINTS and LOADWATCH_MAX_ALERTS must be at least 1");
        }
        Ok(())
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// The password is masked; every other value is shown as loaded.
    pub fn log_config(&self) {
        // ---
        let seed = self
            .sim_seed
            .map_or_else(|| "random".to_string(), |s| s.to_string());

        tracing::info!("Configuration loaded:");
        tracing::info!("  BIND_ADDR          : {}", self.bind_addr);
        tracing::info!("  CONFIG_FILE        : {}", self.config_file.display());
        tracing::info!("  DATA_LOG_FILE      : {}", self.data_log_file.display());
        tracing::info!("  USERNAME           : {}", self.username);
        tracing::info!("  PASSWORD           : ****");
        tracing::info!("  MAX_LOGIN_ATTEMPTS : {}", self.max_login_attempts);
        tracing::info!("  LOCKOUT_SECS       : {}", self.lockout_secs);
        tracing::info!("  TIME_SCALE         : {}", self.time_scale);
        tracing::info!("  MAX_DATA_POINTS    : {}", self.max_data_points);
        tracing::info!("  MAX_ALERTS         : {}", self.max_alerts);
        tracing::info!("  SIM_SEED           : {}", seed);
    }
}
