//! Configuration management for Plangate Core

use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Which store implementation backs the repositories
    pub store_backend: StoreBackend,
    /// Database configuration (present for the MySQL backend)
    pub database: Option<DatabaseConfig>,
    /// Permission cache configuration
    pub permission_cache: PermissionCacheConfig,
    /// Run the seed pipeline before serving
    pub seed_on_startup: bool,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mysql,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(StoreBackend::Mysql),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("Unknown STORE_BACKEND '{}': expected mysql or memory", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct PermissionCacheConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub max_entries: usize,
}

impl PermissionCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// "pretty" or "json"
    pub log_format: String,
    pub metrics_enabled: bool,
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store_backend: StoreBackend = var("STORE_BACKEND", "mysql").parse()?;
        let database = match lookup("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: var("DATABASE_MAX_CONNECTIONS", "10").parse().unwrap_or(10),
                min_connections: var("DATABASE_MIN_CONNECTIONS", "2").parse().unwrap_or(2),
            }),
            None if store_backend == StoreBackend::Mysql => {
                bail!("DATABASE_URL is required when STORE_BACKEND=mysql")
            }
            None => None,
        };

        let sweep_interval_secs: u64 = var("PERMISSION_CACHE_SWEEP_SECS", "120")
            .parse()
            .context("Invalid PERMISSION_CACHE_SWEEP_SECS")?;
        if sweep_interval_secs == 0 {
            bail!("PERMISSION_CACHE_SWEEP_SECS must be greater than zero");
        }
        let max_entries: usize = var("PERMISSION_CACHE_MAX_ENTRIES", "100000")
            .parse()
            .context("Invalid PERMISSION_CACHE_MAX_ENTRIES")?;
        if max_entries == 0 {
            bail!("PERMISSION_CACHE_MAX_ENTRIES must be greater than zero");
        }

        Ok(Self {
            http_host: var("HTTP_HOST", "0.0.0.0"),
            http_port: var("HTTP_PORT", "8080")
                .parse()
                .context("Invalid HTTP_PORT")?,
            store_backend,
            database,
            permission_cache: PermissionCacheConfig {
                ttl_secs: var("PERMISSION_CACHE_TTL_SECS", "600")
                    .parse()
                    .context("Invalid PERMISSION_CACHE_TTL_SECS")?,
                sweep_interval_secs,
                max_entries,
            },
            seed_on_startup: parse_bool(&var("SEED_ON_STARTUP", "false")),
            telemetry: TelemetryConfig {
                service_name: var("SERVICE_NAME", "plangate-core"),
                log_format: var("LOG_FORMAT", "pretty"),
                metrics_enabled: parse_bool(&var("METRICS_ENABLED", "true")),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Database settings, required by the MySQL-only commands
    pub fn require_database(&self) -> Result<&DatabaseConfig> {
        self.database
            .as_ref()
            .context("DATABASE_URL is required for this command")
    }
}
