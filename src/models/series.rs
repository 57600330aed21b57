//! # models::series
//!
//! Per-symbol snapshot held by the store: metadata, observations as the
//! provider ordered them (newest first), and whether the symbol loaded.

use serde::{Deserialize, Serialize};

use super::observation::{Observation, RawValue};

// ─── Provider Shape ───────────────────────────────────────────────────────────

/// `meta` object of a `time_series` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMeta {
    #[serde(default)]
    pub currency:          Option<String>,
    #[serde(default)]
    pub currency_base:     Option<String>,
    #[serde(default)]
    pub currency_quote:    Option<String>,
    #[serde(default)]
    pub exchange:          Option<String>,
    #[serde(default)]
    pub exchange_timezone: Option<String>,
    #[serde(default, rename = "type")]
    pub instrument_type:   Option<String>,
}

/// One symbol's entry in a `time_series` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSeries {
    #[serde(default)]
    pub status:  String,
    #[serde(default)]
    pub meta:    Option<RawMeta>,
    #[serde(default)]
    pub values:  Vec<RawValue>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RawSeries {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

// ─── SymbolMeta ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SymbolMeta {
    pub symbol:            String,
    pub currency_base:     Option<String>,
    pub currency:          Option<String>,
    pub currency_quote:    Option<String>,
    #[serde(rename = "type")]
    pub instrument_type:   Option<String>,
    pub exchange:          Option<String>,
    pub exchange_timezone: Option<String>,
}

impl SymbolMeta {
    /// Metadata for a symbol we know nothing about (failed loads).
    pub fn bare(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    /// The symbol key is always the requested one, not whatever `meta.symbol`
    /// echoes back.
    pub fn from_raw(symbol: &str, raw: Option<&RawMeta>) -> Self {
        let Some(raw) = raw else {
            return Self::bare(symbol);
        };

        Self {
            symbol:            symbol.to_string(),
            currency_base:     non_empty(&raw.currency_base),
            currency:          non_empty(&raw.currency),
            currency_quote:    non_empty(&raw.currency_quote),
            instrument_type:   non_empty(&raw.instrument_type),
            exchange:          non_empty(&raw.exchange),
            exchange_timezone: non_empty(&raw.exchange_timezone),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

// ─── SeriesSnapshot ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    Ok,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub meta:         SymbolMeta,
    /// Newest first, exactly as delivered.
    pub observations: Vec<Observation>,
    pub status:       FetchStatus,
}

impl SeriesSnapshot {
    pub fn loaded(symbol: &str, raw: &RawSeries) -> Self {
        Self {
            meta:         SymbolMeta::from_raw(symbol, raw.meta.as_ref()),
            observations: raw.values.iter().map(Observation::from_raw).collect(),
            status:       FetchStatus::Ok,
        }
    }

    pub fn failed(symbol: &str, reason: impl Into<String>) -> Self {
        Self {
            meta:         SymbolMeta::bare(symbol),
            observations: Vec::new(),
            status:       FetchStatus::Failed(reason.into()),
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }

    /// The provider's most recent element, i.e. the first one stored.
    #[inline]
    pub fn latest(&self) -> Option<&Observation> {
        if self.is_ok() {
            self.observations.first()
        } else {
            None
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Failed(reason) => Some(reason),
            FetchStatus::Ok => None,
        }
    }
}
