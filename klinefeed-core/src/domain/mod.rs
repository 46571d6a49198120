//! Domain types for klinefeed

pub mod interval;
pub mod table;

pub use interval::{Interval, ParseIntervalError};
pub use table::{DateValue, OhlcvColumns, OhlcvRow, OhlcvTable, PredictionRow, PredictionTable};
