//! # routes::quotes
//!
//! Read-only views over the latest published store snapshot.
//!
//! | Method | Path                 | Description                                      |
//! |--------|----------------------|--------------------------------------------------|
//! | GET    | `/api/quotes`        | Table page with per-row sparkline windows        |
//! | GET    | `/api/quotes/window` | Trailing window for one symbol (`symbol`, `at`)  |
//! | GET    | `/api/quotes/series` | Full candle series for one symbol (`symbol`)     |
//!
//! Symbols such as `EUR/USD` contain a slash, so they are query parameters.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::{
    error::AppError,
    models::{field::parse_timestamp, LatestQuoteRow, Observation},
    state::SharedState,
    store::StoreSnapshot,
    table::{build_page, visible_columns, Column, SortDirection, TableQuery, DEFAULT_PAGE_SIZE},
    window::{candle_series, historical_window, merge_latest},
};

// ─── GET /api/quotes ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct QuotesParams {
    pub sort:      Option<Column>,
    pub dir:       Option<SortDirection>,
    pub filter:    Option<String>,
    pub page:      Option<usize>,
    pub page_size: Option<usize>,
    /// Viewport width in CSS pixels, drives column visibility.
    pub width:     Option<u32>,
}

impl QuotesParams {
    fn table_query(&self) -> Result<TableQuery, AppError> {
        if let Some(column) = self.sort.filter(|c| !c.is_sortable()) {
            return Err(AppError::BadRequest(format!("column {column:?} is not sortable")));
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(AppError::BadRequest("page_size must be at least 1".into()));
        }

        Ok(TableQuery {
            sort:       self.sort.map(|c| (c, self.dir.unwrap_or_default())),
            filter:     self.filter.clone(),
            page_index: self.page.unwrap_or(0),
            page_size,
        })
    }
}

/// A table row plus the sparkline window ending at its own timestamp.
#[derive(Debug, Serialize)]
struct QuoteRowView {
    #[serde(flatten)]
    row:   LatestQuoteRow,
    chart: Vec<Observation>,
}

impl QuoteRowView {
    fn new(snapshot: &StoreSnapshot, row: LatestQuoteRow) -> Self {
        let chart = row
            .time()
            .map(|at| historical_window(snapshot, &row.symbol, at))
            .unwrap_or_default();
        Self { row, chart }
    }
}

/// GET /api/quotes — one page of the dashboard table.
///
/// `last_error` is only set by a failed refresh cycle; symbols the provider
/// rejected show up in `symbol_errors` instead.
pub async fn get_quotes(
    State(state): State<SharedState>,
    Query(params): Query<QuotesParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.table_query()?;
    let snapshot = state.store.snapshot().await;
    let refresh = state.scheduler.status().await;

    let page = build_page(merge_latest(&snapshot, &state.symbols), &query);
    debug!(
        total = page.total_rows,
        page  = page.page_index,
        "Serving quotes table"
    );

    let rows: Vec<QuoteRowView> = page
        .rows
        .into_iter()
        .map(|row| QuoteRowView::new(&snapshot, row))
        .collect();

    Ok(Json(json!({
        "ok":            true,
        "rows":          rows,
        "columns":       visible_columns(params.width),
        "paging": {
            "page_index":   page.page_index,
            "page_size":    page.page_size,
            "page_count":   page.page_count,
            "total_rows":   page.total_rows,
            "can_previous": page.can_previous,
            "can_next":     page.can_next,
        },
        "last_error":    refresh.last_error,
        "symbol_errors": snapshot.symbol_errors(&state.symbols),
        "refresh":       refresh,
    })))
}

// ─── GET /api/quotes/window ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WindowParams {
    pub symbol: String,
    /// Reference time; defaults to the symbol's latest observation.
    pub at:     Option<String>,
}

/// GET /api/quotes/window — trailing observations for one symbol, oldest first.
pub async fn get_window(
    State(state): State<SharedState>,
    Query(params): Query<WindowParams>,
) -> Result<impl IntoResponse, AppError> {
    ensure_tracked(&state, &params.symbol)?;

    let at = match params.at.as_deref() {
        Some(raw) => Some(
            parse_timestamp(raw)
                .ok_or_else(|| AppError::BadRequest(format!("cannot parse time '{raw}'")))?,
        ),
        None => None,
    };

    let snapshot = state.store.snapshot().await;
    let (reference, window) = window_at(&snapshot, &params.symbol, at);

    Ok(Json(json!({
        "ok":     true,
        "symbol": params.symbol,
        "at":     reference,
        "window": window,
    })))
}

/// Reference time and window, both taken from the same snapshot. Without an
/// explicit `at` the symbol's latest observation is the reference.
fn window_at(
    snapshot: &StoreSnapshot,
    symbol: &str,
    at: Option<NaiveDateTime>,
) -> (Option<NaiveDateTime>, Vec<Observation>) {
    let reference = at.or_else(|| {
        snapshot
            .get(symbol)
            .and_then(|s| s.latest())
            .and_then(Observation::time)
    });

    let window = reference
        .map(|at| historical_window(snapshot, symbol, at))
        .unwrap_or_default();

    (reference, window)
}

// ─── GET /api/quotes/series ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SeriesParams {
    pub symbol: String,
}

/// GET /api/quotes/series — metadata and every candle for the full chart,
/// ascending. One store read, so all three fields describe the same cycle.
pub async fn get_series(
    State(state): State<SharedState>,
    Query(params): Query<SeriesParams>,
) -> Result<impl IntoResponse, AppError> {
    ensure_tracked(&state, &params.symbol)?;
    let series = state.store.get(&params.symbol).await;

    let (meta, error, candles) = match &series {
        Some(s) => (Some(&s.meta), s.failure(), candle_series(s)),
        None => (None, None, Vec::new()),
    };

    Ok(Json(json!({
        "ok":      true,
        "symbol":  params.symbol,
        "meta":    meta,
        "error":   error,
        "candles": candles,
    })))
}

fn ensure_tracked(state: &SharedState, symbol: &str) -> Result<(), AppError> {
    if state.symbols.iter().any(|s| s == symbol) {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("symbol '{symbol}' is not tracked")))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
