//! Domain models shared across the entire quoteboard service.

pub mod field;
pub mod observation;
pub mod row;
pub mod series;

pub use field::{Field, PLACEHOLDER};
pub use observation::{CandlePoint, Observation};
pub use row::{LatestQuoteRow, SymbolError};
pub use series::{RawSeries, SeriesSnapshot, SymbolMeta};
