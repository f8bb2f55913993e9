//! Service configuration.
//!
//! Loads configuration from environment variables (a `.env` file is honored)
//! with sensible defaults. Invalid values fail startup.

use std::env;
use std::time::Duration;

use thiserror::Error;

use stockflow_purchasing::ReceiptPolicy;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {value} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Full service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store: StoreConfig,
    pub api: ApiConfig,
    pub reporting: ReportingConfig,
    /// Whether purchase orders credit stock, and on which edge.
    pub receipt_policy: ReceiptPolicy,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReportingConfig {
    /// Default N for "most recent movements".
    pub movement_limit: usize,
    /// Default threshold at or below which a product counts as low on stock.
    pub low_stock_threshold: i64,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup("STOCKFLOW_STORE").as_deref().map(str::trim) {
            None | Some("memory") => StoreBackend::Memory,
            Some("postgres") => StoreBackend::Postgres,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STOCKFLOW_STORE",
                    value: other.to_string(),
                    reason: "expected memory or postgres".to_string(),
                });
            }
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let store = StoreConfig {
            backend,
            database_url,
            max_connections: parse_or(&lookup, "STOCKFLOW_DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STOCKFLOW_DB_ACQUIRE_TIMEOUT_SECS",
                5,
            )?),
        };

        let api = ApiConfig {
            host: lookup("STOCKFLOW_API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "STOCKFLOW_API_PORT", 8080)?,
        };

        let reporting = ReportingConfig {
            movement_limit: parse_or(&lookup, "STOCKFLOW_MOVEMENT_REPORT_LIMIT", 10)?,
            low_stock_threshold: parse_or(&lookup, "STOCKFLOW_LOW_STOCK_THRESHOLD", 20)?,
        };

        let receipt_policy = match lookup("STOCKFLOW_PURCHASE_RECEIPT_POLICY") {
            None => ReceiptPolicy::default(),
            Some(value) => ReceiptPolicy::parse(&value).map_err(|e| ConfigError::Invalid {
                key: "STOCKFLOW_PURCHASE_RECEIPT_POLICY",
                value,
                reason: e.to_string(),
            })?,
        };

        Ok(Self {
            store,
            api,
            reporting,
            receipt_policy,
        })
    }

    /// In-memory configuration for tests: ephemeral port, default policies.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: None,
                max_connections: 10,
                acquire_timeout: Duration::from_secs(5),
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            reporting: ReportingConfig {
                movement_limit: 10,
                low_stock_threshold: 20,
            },
            receipt_policy: ReceiptPolicy::None,
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
