//! # provider
//!
//! The quote source the scheduler pulls from. [`QuoteSource`] is the seam:
//! production uses [`twelve_data::TwelveDataClient`], tests inject a fake.
//!
//! A source returns a [`ProviderPayload`], the raw per-symbol JSON entries of
//! one response. Turning entries into snapshots is the store's job, so one bad
//! entry only ever affects its own symbol.

pub mod twelve_data;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

/// HTTP-ish codes that mean "the request itself was refused" even when a
/// single symbol was asked for.
const REQUEST_LEVEL_CODES: [i64; 3] = [401, 403, 429];

// ─── Trait ────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Short identifier used in logs.
    fn id(&self) -> &'static str;

    /// Fetch the latest series for every symbol in one request.
    async fn fetch(&self, symbols: &[String]) -> Result<ProviderPayload, FetchError>;
}

// ─── Payload ──────────────────────────────────────────────────────────────────

/// Response body keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct ProviderPayload {
    entries: HashMap<String, Value>,
}

impl ProviderPayload {
    /// Normalise a decoded `time_series` body.
    ///
    /// * multi-symbol bodies are already keyed by symbol;
    /// * a single-symbol body is a bare series and gets wrapped under the
    ///   requested symbol;
    /// * an unkeyed `{ "status": "error", "code", "message" }` object is a
    ///   request-level failure.
    pub fn from_body(symbols: &[String], body: Value) -> Result<Self, FetchError> {
        let Value::Object(object) = body else {
            return Err(FetchError::Malformed("expected a JSON object".into()));
        };

        let keyed = symbols.iter().any(|s| object.contains_key(s));
        let status = object
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_owned);

        if keyed || status.is_none() {
            return Ok(Self {
                entries: object.into_iter().collect(),
            });
        }

        let code = object.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown provider error")
            .to_string();

        match (symbols, status.as_deref()) {
            ([_], Some("error")) if REQUEST_LEVEL_CODES.contains(&code) => {
                Err(FetchError::Provider { code, message })
            }
            ([only], _) => Ok(Self::from_entries([(only.clone(), Value::Object(object))])),
            (_, Some("error")) => Err(FetchError::Provider { code, message }),
            _ => Err(FetchError::Malformed(
                "unkeyed series for a multi-symbol request".into(),
            )),
        }
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    #[inline]
    pub fn entry(&self, symbol: &str) -> Option<&Value> {
        self.entries.get(symbol)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
