//! # store
//!
//! [`TimeSeriesStore`] — the latest [`SeriesSnapshot`] per symbol.
//!
//! ## Publication
//!
//! The whole symbol map is an immutable [`StoreSnapshot`] behind an `Arc`.
//! `replace` builds the next map off to the side and swaps the `Arc` under a
//! short write lock, so readers (merge, window, HTTP handlers) always work on
//! one complete set and never hold the lock while computing.
//!
//! The scheduler is the only writer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::models::{RawSeries, SeriesSnapshot, SymbolError};
use crate::provider::ProviderPayload;

// ─── Snapshot Set ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    series: HashMap<String, SeriesSnapshot>,
}

impl StoreSnapshot {
    #[inline]
    pub fn get(&self, symbol: &str) -> Option<&SeriesSnapshot> {
        self.series.get(symbol)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Failed symbols, in the order they were requested.
    pub fn symbol_errors(&self, symbols: &[String]) -> Vec<SymbolError> {
        symbols
            .iter()
            .filter_map(|symbol| {
                let reason = self.series.get(symbol)?.failure()?;
                Some(SymbolError {
                    symbol:  symbol.clone(),
                    message: reason.to_string(),
                })
            })
            .collect()
    }
}

/// What one `replace` installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub loaded: usize,
    pub failed: usize,
}

// ─── Store ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct TimeSeriesStore {
    published: RwLock<Arc<StoreSnapshot>>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install one snapshot per requested symbol: `Ok` when the provider
    /// delivered an ok series, `Failed` otherwise. A failed symbol does not
    /// keep the previous cycle's data. Symbols outside the request are left
    /// as they were.
    pub async fn replace(&self, symbols: &[String], payload: &ProviderPayload) -> ReplaceSummary {
        let fresh: Vec<(String, SeriesSnapshot)> = symbols
            .iter()
            .map(|symbol| (symbol.clone(), parse_entry(symbol, payload)))
            .collect();

        let failed = fresh.iter().filter(|(_, s)| !s.is_ok()).count();
        let summary = ReplaceSummary {
            loaded: fresh.len() - failed,
            failed,
        };

        let mut guard = self.published.write().await;
        let mut next = StoreSnapshot::clone(&guard);
        next.series.extend(fresh);
        *guard = Arc::new(next);

        summary
    }

    /// `None` until a replace has covered this symbol.
    pub async fn get(&self, symbol: &str) -> Option<SeriesSnapshot> {
        self.snapshot().await.get(symbol).cloned()
    }

    /// The currently published set. Cheap: clones an `Arc`.
    pub async fn snapshot(&self) -> Arc<StoreSnapshot> {
        Arc::clone(&*self.published.read().await)
    }
}

fn parse_entry(symbol: &str, payload: &ProviderPayload) -> SeriesSnapshot {
    let fallback = || format!("error loading {symbol}");

    let Some(entry) = payload.entry(symbol) else {
        return SeriesSnapshot::failed(symbol, fallback());
    };

    match serde_json::from_value::<RawSeries>(entry.clone()) {
        Ok(raw) if raw.is_ok() => SeriesSnapshot::loaded(symbol, &raw),
        Ok(raw) => {
            let reason = raw
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(fallback);
            SeriesSnapshot::failed(symbol, reason)
        }
        Err(e) => {
            warn!(symbol, error = %e, "Series entry did not decode");
            SeriesSnapshot::failed(symbol, fallback())
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
