//! # models::row
//!
//! Derived, never-stored views handed to the table: one [`LatestQuoteRow`]
//! per loaded symbol and one [`SymbolError`] per symbol that failed.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use super::field::{Field, PLACEHOLDER};
use super::observation::Observation;
use super::series::SymbolMeta;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestQuoteRow {
    pub symbol:          String,
    pub currency_base:   String,
    #[serde(rename = "type")]
    pub instrument_type: String,
    #[serde(rename = "datetime")]
    pub timestamp:       Field<NaiveDateTime>,
    pub open:            Field<Decimal>,
    pub close:           Field<Decimal>,
    pub volume:          Field<Decimal>,
}

impl LatestQuoteRow {
    /// Currency falls back `currency_base` → `currency` → placeholder; the
    /// instrument type falls back straight to the placeholder.
    pub fn new(meta: &SymbolMeta, latest: &Observation) -> Self {
        let currency_base = meta
            .currency_base
            .as_deref()
            .or(meta.currency.as_deref())
            .unwrap_or(PLACEHOLDER)
            .to_string();

        let instrument_type = meta
            .instrument_type
            .as_deref()
            .unwrap_or(PLACEHOLDER)
            .to_string();

        Self {
            symbol: meta.symbol.clone(),
            currency_base,
            instrument_type,
            timestamp: latest.timestamp.clone(),
            open:      latest.open.clone(),
            close:     latest.close.clone(),
            volume:    latest.volume.clone(),
        }
    }

    #[inline]
    pub fn time(&self) -> Option<NaiveDateTime> {
        self.timestamp.value().copied()
    }
}

/// A symbol the provider reported as not-ok in the latest cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolError {
    pub symbol:  String,
    pub message: String,
}
