//! # Domain Models
//!
//! Canonical value types shared by the provider client, the cache and the service.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Quote`] | Latest price snapshot for one symbol |
//! | [`Ohlcv`] | One price bar |
//! | [`HistoricalData`] | Ordered bars for one symbol |
//! | [`SearchResult`] | Symbol search hit |
//! | [`TechnicalIndicator`] | Computed indicator with aligned dates |
//! | [`Symbol`] | Validated, uppercase ticker |
//! | [`Interval`] | Bar granularity (1d, 1wk, 1mo) |
//!
//! All types are plain values: they are cloned between components and never shared
//! mutably.

mod date;
mod interval;
mod models;
mod symbol;

pub use date::{date_from_unix, format_date, parse_date, today_utc, unix_midnight};
pub use interval::Interval;
pub use models::{HistoricalData, Ohlcv, Quote, SearchResult, TechnicalIndicator};
pub use symbol::{is_valid_symbol, normalize_symbol, Symbol};
