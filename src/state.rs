//! # state
//!
//! Shared application state handed to every Axum handler as
//! `State<SharedState>`.
//!
//! The scheduler is the only writer of the store. Handlers read a published
//! [`StoreSnapshot`](crate::store::StoreSnapshot) and derive rows, windows
//! and candles from it without holding any lock.

use std::sync::Arc;
use std::time::Duration;

use crate::provider::QuoteSource;
use crate::scheduler::RefreshScheduler;
use crate::store::TimeSeriesStore;

// ─── AppState ─────────────────────────────────────────────────────────────────

pub struct AppState {
    /// Tracked symbols in display order.
    pub symbols:   Vec<String>,
    pub store:     Arc<TimeSeriesStore>,
    /// Refresh loop, its status and its event stream.
    pub scheduler: RefreshScheduler,
}

impl AppState {
    pub fn new(source: Arc<dyn QuoteSource>, symbols: Vec<String>, poll_interval: Duration) -> Self {
        let store = Arc::new(TimeSeriesStore::new());
        let scheduler = RefreshScheduler::new(
            source,
            Arc::clone(&store),
            symbols.clone(),
            poll_interval,
        );

        Self {
            symbols,
            store,
            scheduler,
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Build the state. The scheduler is not started here.
pub fn build_state(
    source: Arc<dyn QuoteSource>,
    symbols: Vec<String>,
    poll_interval: Duration,
) -> SharedState {
    Arc::new(AppState::new(source, symbols, poll_interval))
}
