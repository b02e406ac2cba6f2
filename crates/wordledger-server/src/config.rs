// ABOUTME: Configuration loading and validation for the wordledger CLI and server.
// ABOUTME: Reads WORDLEDGER_* environment variables and turns them into ledger options.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use wordledger_store::LedgerOptions;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WORDLEDGER_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Settings shared by every entry point.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub ledger: LedgerOptions,
}

impl LedgerConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - WORDLEDGER_DB: SQLite database file (default: ~/.wordledger/ledger.db)
    /// - WORDLEDGER_BIND: socket address for `serve` (default: 127.0.0.1:7341)
    /// - WORDLEDGER_MAX_ATTEMPTS: total attempts per unit of work, first try included (default: 3)
    /// - WORDLEDGER_RETRY_BACKOFF_MS: base delay between attempts (default: 50)
    /// - WORDLEDGER_BUSY_TIMEOUT_MS: SQLite busy timeout (default: 5000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = var("WORDLEDGER_DB").map(PathBuf::from).unwrap_or_else(|| {
            var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".wordledger")
                .join("ledger.db")
        });

        let bind_str = var("WORDLEDGER_BIND").unwrap_or_else(|| "127.0.0.1:7341".to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let defaults = LedgerOptions::default();
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match var(name) {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { var: name, value }),
                None => Ok(default),
            }
        };

        let max_attempts = number("WORDLEDGER_MAX_ATTEMPTS", u64::from(defaults.max_attempts))?;
        let max_attempts = u32::try_from(max_attempts)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ConfigError::InvalidNumber {
                var: "WORDLEDGER_MAX_ATTEMPTS",
                value: max_attempts.to_string(),
            })?;
        let retry_backoff = Duration::from_millis(number(
            "WORDLEDGER_RETRY_BACKOFF_MS",
            defaults.retry_backoff.as_millis() as u64,
        )?);
        let busy_timeout = Duration::from_millis(number(
            "WORDLEDGER_BUSY_TIMEOUT_MS",
            defaults.busy_timeout.as_millis() as u64,
        )?);

        Ok(Self {
            db_path,
            bind,
            ledger: LedgerOptions {
                max_attempts,
                retry_backoff,
                busy_timeout,
            },
        })
    }
}
