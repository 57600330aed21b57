//! # models::observation
//!
//! One price sample ([`Observation`]) plus the candle shape the full chart
//! consumes ([`CandlePoint`]).

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::field::Field;

// ─── Provider Shape ───────────────────────────────────────────────────────────

/// One element of `values[]` in a Twelve Data `time_series` response.
///
/// Every field is kept as loose JSON so that a number-typed or null value
/// degrades into a [`Field::Invalid`] instead of failing the whole series.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawValue {
    #[serde(default)]
    pub datetime: Option<Value>,
    #[serde(default)]
    pub open:     Option<Value>,
    #[serde(default)]
    pub high:     Option<Value>,
    #[serde(default)]
    pub low:      Option<Value>,
    #[serde(default)]
    pub close:    Option<Value>,
    #[serde(default)]
    pub volume:   Option<Value>,
}

/// Flatten a loose JSON scalar into the text we try to parse.
fn as_text(value: &Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

// ─── Observation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    #[serde(rename = "datetime")]
    pub timestamp: Field<NaiveDateTime>,
    pub open:      Field<Decimal>,
    pub high:      Field<Decimal>,
    pub low:       Field<Decimal>,
    pub close:     Field<Decimal>,
    /// Forex pairs usually have no volume.
    pub volume:    Field<Decimal>,
}

impl Observation {
    pub fn from_raw(raw: &RawValue) -> Self {
        let decimal = |v: &Option<Value>| Field::parse_decimal(as_text(v).as_deref());

        Self {
            timestamp: Field::parse_timestamp(as_text(&raw.datetime).as_deref()),
            open:      decimal(&raw.open),
            high:      decimal(&raw.high),
            low:       decimal(&raw.low),
            close:     decimal(&raw.close),
            volume:    decimal(&raw.volume),
        }
    }

    /// Parsed timestamp, if any. Observations without one can be displayed
    /// but never take part in time filtering.
    #[inline]
    pub fn time(&self) -> Option<NaiveDateTime> {
        self.timestamp.value().copied()
    }
}

// ─── Candles ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

/// One candle for the full chart. `x` is milliseconds since the epoch with
/// the provider's wall-clock time read as UTC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandlePoint {
    pub x:     i64,
    pub o:     Field<Decimal>,
    pub h:     Field<Decimal>,
    pub l:     Field<Decimal>,
    pub c:     Field<Decimal>,
    pub trend: Option<Trend>,
}

impl CandlePoint {
    /// `None` when the observation has no usable timestamp.
    pub fn from_observation(obs: &Observation) -> Option<Self> {
        let x = obs.time()?.and_utc().timestamp_millis();

        let trend = match (obs.open.value(), obs.close.value()) {
            (Some(open), Some(close)) if close >= open => Some(Trend::Up),
            (Some(_), Some(_)) => Some(Trend::Down),
            _ => None,
        };

        Some(Self {
            x,
            o: obs.open.clone(),
            h: obs.high.clone(),
            l: obs.low.clone(),
            c: obs.close.clone(),
            trend,
        })
    }
}
