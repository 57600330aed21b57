//! # config — read configuration from environment variables
//!
//! | Variable               | Default                      |
//! |------------------------|------------------------------|
//! | `TWELVE_DATA_API_KEY`  | required                     |
//! | `TWELVE_DATA_URL`      | `https://api.twelvedata.com` |
//! | `QUOTE_SYMBOLS`        | `AAPL,EUR/USD,ETH/BTC`       |
//! | `QUOTE_INTERVAL`       | `1min`                       |
//! | `QUOTE_OUTPUT_SIZE`    | `40`                         |
//! | `POLL_INTERVAL_SECS`   | `30`                         |
//! | `REQUEST_TIMEOUT_SECS` | `10`                         |
//! | `BIND_ADDR`            | `0.0.0.0:3000`               |

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};

const DEFAULT_SYMBOLS: &str = "AAPL,EUR/USD,ETH/BTC";

#[derive(Debug, Clone)]
pub struct Config {
    /// Twelve Data API key. Never logged.
    pub api_key:         String,
    pub provider_url:    String,
    /// Tracked symbols in display order, deduplicated.
    pub symbols:         Vec<String>,
    /// Candle interval requested from the provider, e.g. `"1min"`.
    pub interval:        String,
    /// Observations requested per symbol.
    pub output_size:     u32,
    pub poll_interval:   Duration,
    pub request_timeout: Duration,
    pub bind_addr:       SocketAddr,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("TWELVE_DATA_API_KEY")
            .context("TWELVE_DATA_API_KEY environment variable is required")?;

        let symbols = parse_symbols(
            &std::env::var("QUOTE_SYMBOLS").unwrap_or_else(|_| DEFAULT_SYMBOLS.to_string()),
        );
        if symbols.is_empty() {
            bail!("QUOTE_SYMBOLS must name at least one symbol");
        }

        let poll_secs: u64 = env_parse("POLL_INTERVAL_SECS", 30)?;
        if poll_secs == 0 {
            bail!("POLL_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            api_key,
            provider_url:    std::env::var("TWELVE_DATA_URL")
                .unwrap_or_else(|_| "https://api.twelvedata.com".to_string()),
            symbols,
            interval:        std::env::var("QUOTE_INTERVAL").unwrap_or_else(|_| "1min".to_string()),
            output_size:     env_parse("QUOTE_OUTPUT_SIZE", 40)?,
            poll_interval:   Duration::from_secs(poll_secs),
            request_timeout: Duration::from_secs(env_parse("REQUEST_TIMEOUT_SECS", 10)?),
            bind_addr:       std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
                .parse()
                .context("BIND_ADDR must be a socket address like 0.0.0.0:3000")?,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Comma-separated list, trimmed, empty entries dropped, first occurrence
/// wins on duplicates.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !symbols.iter().any(|s| s == symbol) {
            symbols.push(symbol.to_string());
        }
    }
    symbols
}
