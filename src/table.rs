//! # table
//!
//! The dashboard table as a pure pipeline over merged rows:
//!
//! ```text
//!   rows ──filter──▶ sort ──paginate──▶ TablePage
//! ```
//!
//! Column visibility depends only on the viewport width the client reports.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{Field, LatestQuoteRow};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Viewports at least this wide get every column.
pub const WIDE_VIEWPORT: u32 = 640;

// ─── Columns ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Symbol,
    CurrencyBase,
    Type,
    Datetime,
    Open,
    Close,
    Volume,
    /// Mini chart of the historical window. Display only.
    Chart,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::Symbol,
        Column::CurrencyBase,
        Column::Type,
        Column::Datetime,
        Column::Open,
        Column::Close,
        Column::Volume,
        Column::Chart,
    ];

    const NARROW: [Column; 4] = [
        Column::Symbol,
        Column::CurrencyBase,
        Column::Volume,
        Column::Chart,
    ];

    #[inline]
    pub fn is_sortable(self) -> bool {
        self != Column::Chart
    }
}

/// Columns to render. Without a width every column is shown.
pub fn visible_columns(width: Option<u32>) -> Vec<Column> {
    match width {
        Some(w) if w < WIDE_VIEWPORT => Column::NARROW.to_vec(),
        _ => Column::ALL.to_vec(),
    }
}

// ─── Query ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    /// `None` keeps merge order (newest first).
    pub sort:       Option<(Column, SortDirection)>,
    pub filter:     Option<String>,
    pub page_index: usize,
    pub page_size:  usize,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            sort:       None,
            filter:     None,
            page_index: 0,
            page_size:  DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    pub rows:         Vec<LatestQuoteRow>,
    /// Rows left after filtering, across all pages.
    pub total_rows:   usize,
    pub page_index:   usize,
    pub page_size:    usize,
    pub page_count:   usize,
    pub can_previous: bool,
    pub can_next:     bool,
}

// ─── Pipeline ─────────────────────────────────────────────────────────────────

/// Filter, sort and cut one page. A page index past the end is clamped to the
/// last page.
pub fn build_page(rows: Vec<LatestQuoteRow>, query: &TableQuery) -> TablePage {
    let mut rows: Vec<LatestQuoteRow> = match query.filter.as_deref().map(str::trim) {
        Some(needle) if !needle.is_empty() => {
            let needle = needle.to_lowercase();
            rows.into_iter().filter(|row| matches_filter(row, &needle)).collect()
        }
        _ => rows,
    };

    if let Some((column, direction)) = query.sort {
        rows.sort_by(|a, b| compare_rows(a, b, column, direction));
    }

    let page_size = query.page_size.max(1);
    let total_rows = rows.len();
    let page_count = total_rows.div_ceil(page_size);
    let page_index = query.page_index.min(page_count.saturating_sub(1));

    let rows: Vec<LatestQuoteRow> = rows
        .into_iter()
        .skip(page_index * page_size)
        .take(page_size)
        .collect();

    TablePage {
        rows,
        total_rows,
        page_index,
        page_size,
        page_count,
        can_previous: page_index > 0,
        can_next:     page_index + 1 < page_count,
    }
}

fn matches_filter(row: &LatestQuoteRow, needle: &str) -> bool {
    [&row.symbol, &row.currency_base, &row.instrument_type]
        .into_iter()
        .any(|text| text.to_lowercase().contains(needle))
}

fn compare_rows(a: &LatestQuoteRow, b: &LatestQuoteRow, column: Column, direction: SortDirection) -> Ordering {
    let text = |x: &str, y: &str| apply(x.cmp(y), direction);

    match column {
        Column::Symbol => text(&a.symbol, &b.symbol),
        Column::CurrencyBase => text(&a.currency_base, &b.currency_base),
        Column::Type => text(&a.instrument_type, &b.instrument_type),
        Column::Datetime => compare_fields(&a.timestamp, &b.timestamp, direction),
        Column::Open => compare_fields(&a.open, &b.open, direction),
        Column::Close => compare_fields(&a.close, &b.close, direction),
        Column::Volume => compare_fields(&a.volume, &b.volume, direction),
        Column::Chart => Ordering::Equal,
    }
}

/// Parsed values compare in `direction`; placeholders always sink.
fn compare_fields<T: Ord>(a: &Field<T>, b: &Field<T>, direction: SortDirection) -> Ordering {
    match (a.value(), b.value()) {
        (Some(x), Some(y)) => apply(x.cmp(y), direction),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[inline]
fn apply(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
