//! # models::field
//!
//! Defines [`Field`], a single provider value that either parsed cleanly or
//! is carried as raw text.
//!
//! Twelve Data ships every number as a JSON string. A string that does not
//! parse must not sink the whole observation, so the failure is kept on the
//! field itself and rendered as [`PLACEHOLDER`] by the presentation layer.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// Shown in place of any absent or unparseable value.
pub const PLACEHOLDER: &str = "—";

// ─── Field ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// Parsed value.
    Value(T),
    /// The provider did not send this field.
    Missing,
    /// The provider sent something we could not parse (raw text kept for logs).
    Invalid(String),
}

impl<T> Field<T> {
    #[inline]
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => v.serialize(serializer),
            Field::Missing | Field::Invalid(_) => serializer.serialize_str(PLACEHOLDER),
        }
    }
}

// ─── Parsers ──────────────────────────────────────────────────────────────────

impl Field<Decimal> {
    /// Parse a price or volume. Negative values are rejected: quotes and
    /// volumes are never below zero.
    pub fn parse_decimal(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Field::Missing;
        };

        let text = raw.trim();
        let parsed = Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text));

        match parsed {
            Ok(v) if v.is_sign_negative() && !v.is_zero() => Field::Invalid(raw.to_string()),
            Ok(v) => Field::Value(v),
            Err(_) => Field::Invalid(raw.to_string()),
        }
    }
}

impl Field<NaiveDateTime> {
    pub fn parse_timestamp(raw: Option<&str>) -> Self {
        match raw {
            None => Field::Missing,
            Some(text) => match parse_timestamp(text) {
                Some(ts) => Field::Value(ts),
                None => Field::Invalid(text.to_string()),
            },
        }
    }
}

/// Accepts the provider's `YYYY-MM-DD HH:MM:SS`, the ISO `T` separator, and
/// date-only values (daily intervals), which are taken as midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
