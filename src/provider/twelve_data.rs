//! # provider::twelve_data — Twelve Data `time_series` client
//!
//! One `GET /time_series?symbol=A,B,...` per refresh cycle, authenticated
//! with the `Authorization: apikey <key>` header. The body is
//! decoded loosely and handed to [`ProviderPayload::from_body`]; per-symbol
//! parsing happens later in the store.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::FetchError;

use super::{ProviderPayload, QuoteSource};

pub struct TwelveDataClient {
    http:        reqwest::Client,
    base_url:    String,
    api_key:     String,
    interval:    String,
    output_size: u32,
    timeout:     Duration,
}

impl TwelveDataClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            base_url:    config.provider_url.trim_end_matches('/').to_string(),
            api_key:     config.api_key.clone(),
            interval:    config.interval.clone(),
            output_size: config.output_size,
            timeout:     config.request_timeout,
        }
    }
}

#[async_trait]
impl QuoteSource for TwelveDataClient {
    fn id(&self) -> &'static str {
        "TWELVE_DATA"
    }

    async fn fetch(&self, symbols: &[String]) -> Result<ProviderPayload, FetchError> {
        let url = format!("{}/time_series", self.base_url);
        let joined = symbols.join(",");
        let output_size = self.output_size.to_string();

        debug!(symbols = %joined, interval = %self.interval, "Requesting time series...");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("symbol", joined.as_str()),
                ("interval", self.interval.as_str()),
                ("outputsize", output_size.as_str()),
            ])
            .header("Authorization", format!("apikey {}", self.api_key))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        ProviderPayload::from_body(symbols, body)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
