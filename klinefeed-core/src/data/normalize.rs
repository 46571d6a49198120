//! Raw exchange klines → canonical OHLCV rows.

use super::provider::{DataError, RawKline};
use crate::domain::{OhlcvRow, OhlcvTable};
use chrono::DateTime;

/// Map raw klines onto `date, open, high, low, close, volume`.
///
/// `date` comes from the kline's close time, not its open time. Rows keep
/// their input order; the fetcher already hands over disjoint ascending pages.
pub fn normalize(rows: &[RawKline]) -> Result<OhlcvTable, DataError> {
    let mut out = Vec::with_capacity(rows.len());

    for (i, raw) in rows.iter().enumerate() {
        let date = DateTime::from_timestamp_millis(raw.close_time).ok_or_else(|| {
            DataError::MalformedPayload(format!("row {i}: close_time out of range: {}", raw.close_time))
        })?;

        out.push(OhlcvRow {
            date,
            open: parse_field(i, "open", &raw.open)?,
            high: parse_field(i, "high", &raw.high)?,
            low: parse_field(i, "low", &raw.low)?,
            close: parse_field(i, "close", &raw.close)?,
            volume: parse_field(i, "volume", &raw.volume)?,
        });
    }

    Ok(OhlcvTable::new(out))
}

fn parse_field(row: usize, name: &str, value: &str) -> Result<f64, DataError> {
    value.trim().parse::<f64>().map_err(|_| {
        DataError::MalformedPayload(format!("row {row}: {name} is not numeric: '{value}'"))
    })
}
