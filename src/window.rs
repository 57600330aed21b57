//! # window
//!
//! Pure derivations over one published [`StoreSnapshot`]:
//!
//! * [`merge_latest`] — one [`LatestQuoteRow`] per loaded symbol, newest first;
//! * [`historical_window`] — the trailing observations up to a reference time,
//!   oldest first, for the inline sparkline;
//! * [`candle_series`] — one whole series as chart candles.
//!
//! Nothing here caches: every call reflects the snapshot it is given.

use std::cmp::Ordering;

use chrono::NaiveDateTime;

use crate::models::{CandlePoint, LatestQuoteRow, Observation, SeriesSnapshot};
use crate::store::StoreSnapshot;

/// Maximum number of observations in a sparkline window.
pub const WINDOW_LEN: usize = 15;

/// Newest first; a missing timestamp counts as older than any real one.
fn newest_first(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    b.cmp(&a)
}

/// Latest row for every requested symbol whose snapshot is `Ok` and has at
/// least one observation. Failed or empty symbols are skipped; their errors
/// are reported through [`StoreSnapshot::symbol_errors`].
///
/// Sorted by timestamp descending with a stable sort, so equal timestamps keep
/// the order of `symbols`.
pub fn merge_latest(snapshot: &StoreSnapshot, symbols: &[String]) -> Vec<LatestQuoteRow> {
    let mut rows: Vec<LatestQuoteRow> = symbols
        .iter()
        .filter_map(|symbol| {
            let series = snapshot.get(symbol)?;
            let latest = series.latest()?;
            Some(LatestQuoteRow::new(&series.meta, latest))
        })
        .collect();

    rows.sort_by(|a, b| newest_first(a.time(), b.time()));
    rows
}

/// Up to [`WINDOW_LEN`] observations of `symbol` at or before `reference`,
/// ascending by time. Empty when the symbol is unknown, failed, or has no
/// qualifying observations.
pub fn historical_window(
    snapshot: &StoreSnapshot,
    symbol: &str,
    reference: NaiveDateTime,
) -> Vec<Observation> {
    let Some(series) = snapshot.get(symbol).filter(|s| s.is_ok()) else {
        return Vec::new();
    };

    let mut window: Vec<(NaiveDateTime, &Observation)> = series
        .observations
        .iter()
        .filter_map(|obs| obs.time().map(|ts| (ts, obs)))
        .filter(|(ts, _)| *ts <= reference)
        .collect();

    window.sort_by_key(|(ts, _)| *ts);

    let skip = window.len().saturating_sub(WINDOW_LEN);
    window
        .into_iter()
        .skip(skip)
        .map(|(_, obs)| obs.clone())
        .collect()
}

/// Every timestamped observation of a loaded series as a candle, ascending.
/// Empty for a failed series.
pub fn candle_series(series: &SeriesSnapshot) -> Vec<CandlePoint> {
    if !series.is_ok() {
        return Vec::new();
    }

    let mut candles: Vec<CandlePoint> = series
        .observations
        .iter()
        .filter_map(CandlePoint::from_observation)
        .collect();

    candles.sort_by_key(|c| c.x);
    candles
}

// ─── Tests ────────────────────────────────────────────────────────────────────
