//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `APIWATCH_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `APIWATCH_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `APIWATCH_MONITORING__SCHEDULER_TICK=10s` sets the `monitoring.scheduler_tick` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! APIWATCH_PORT=8080
//!
//! # Override nested values
//! APIWATCH_MONITORING__MAX_PARALLEL_CHECKS=4
//! APIWATCH_MONITORING__DEFAULTS__LATENCY_THRESHOLD_MS=500
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;
use crate::monitor::models::MonitorConfig;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "APIWATCH_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// CORS settings for browser clients
    pub cors: CorsConfig,
    /// Monitoring engine settings
    pub monitoring: MonitoringSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors: CorsConfig::default(),
            monitoring: MonitoringSettings::default(),
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: Some(3600),
        }
    }
}

/// Monitoring engine configuration.
///
/// Controls the background scheduler, check concurrency, result retention, and the
/// per-endpoint defaults applied when no explicit monitoring configuration exists.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitoringSettings {
    /// How often the scheduler scans for endpoints whose check interval has elapsed.
    /// This is the scan cadence, not the per-endpoint check interval.
    #[serde(with = "humantime_serde")]
    pub scheduler_tick: Duration,
    /// Maximum number of endpoint checks running at the same time
    pub max_parallel_checks: usize,
    /// Maximum probe results retained per endpoint (oldest are evicted first)
    pub max_retained_results: usize,
    /// Multiplier over a threshold at which an alert escalates from warning to danger
    pub danger_factor: f64,
    /// Consecutive failed checks required before an availability alert opens
    pub min_consecutive_failures: u32,
    /// Default per-endpoint monitoring configuration
    pub defaults: MonitorConfig,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            scheduler_tick: Duration::from_secs(30),
            max_parallel_checks: 10,
            max_retained_results: 500,
            danger_factor: 1.5,
            min_consecutive_failures: 3,
            defaults: MonitorConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.monitoring.max_parallel_checks == 0 {
            return Err(Error::InvalidConfig {
                message: "monitoring.max_parallel_checks must be at least 1".to_string(),
            });
        }
        if self.monitoring.max_retained_results == 0 {
            return Err(Error::InvalidConfig {
                message: "monitoring.max_retained_results must be at least 1".to_string(),
            });
        }
        if self.monitoring.danger_factor <= 1.0 {
            return Err(Error::InvalidConfig {
                message: format!(
                    "monitoring.danger_factor must be greater than 1.0, got {}",
                    self.monitoring.danger_factor
                ),
            });
        }
        if self.monitoring.min_consecutive_failures == 0 {
            return Err(Error::InvalidConfig {
                message: "monitoring.min_consecutive_failures must be at least 1".to_string(),
            });
        }
        if self.monitoring.scheduler_tick.is_zero() {
            return Err(Error::InvalidConfig {
                message: "monitoring.scheduler_tick must be non-zero".to_string(),
            });
        }
        self.monitoring.defaults.validate()?;
        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("APIWATCH_").split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
