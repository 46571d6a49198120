//! OHLCV table: the canonical tabular schema handed to models and the cache.

use crate::data::provider::DataError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized time bucket: `date, open, high, low, close, volume`.
///
/// `date` carries millisecond precision. For exchange klines it is the
/// bucket's close time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvRow {
    /// Returns true if any price or volume field is NaN.
    pub fn has_missing(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Epoch milliseconds of `date`.
    pub fn timestamp_ms(&self) -> i64 {
        self.date.timestamp_millis()
    }
}

/// Ordered sequence of [`OhlcvRow`]s.
///
/// Serializes as a list of records (`[{"date": ..., "open": ...}, ...]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OhlcvTable {
    rows: Vec<OhlcvRow>,
}

impl OhlcvTable {
    pub fn new(rows: Vec<OhlcvRow>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[OhlcvRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<OhlcvRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&OhlcvRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&OhlcvRow> {
        self.rows.last()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.close)
    }

    /// Strictly ascending by date (which also means no duplicate dates).
    pub fn is_strictly_ascending(&self) -> bool {
        self.rows.windows(2).all(|w| w[0].date < w[1].date)
    }

    /// Drop rows with any missing field.
    pub fn drop_missing(self) -> Self {
        Self {
            rows: self.rows.into_iter().filter(|r| !r.has_missing()).collect(),
        }
    }

    /// Build a table from column-oriented input, the shape model clients send.
    pub fn from_columns(columns: OhlcvColumns) -> Result<Self, DataError> {
        let n = columns.date.len();
        let lengths = [
            ("open", columns.open.len()),
            ("high", columns.high.len()),
            ("low", columns.low.len()),
            ("close", columns.close.len()),
            ("volume", columns.volume.len()),
        ];
        if let Some((name, len)) = lengths.iter().find(|(_, len)| *len != n) {
            return Err(DataError::MalformedPayload(format!(
                "column '{name}' has {len} values but 'date' has {n}"
            )));
        }

        let mut rows = Vec::with_capacity(n);
        for (i, date) in columns.date.into_iter().enumerate() {
            rows.push(OhlcvRow {
                date: date.resolve()?,
                open: columns.open[i],
                high: columns.high[i],
                low: columns.low[i],
                close: columns.close[i],
                volume: columns.volume[i],
            });
        }
        Ok(Self { rows })
    }
}

impl From<Vec<OhlcvRow>> for OhlcvTable {
    fn from(rows: Vec<OhlcvRow>) -> Self {
        Self::new(rows)
    }
}

/// Column-oriented OHLCV payload: `{"date": [...], "open": [...], ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct OhlcvColumns {
    pub date: Vec<DateValue>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

/// A date cell as clients send it: epoch milliseconds or text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Millis(i64),
    Text(String),
}

impl DateValue {
    /// Accepts epoch milliseconds, RFC 3339, `YYYY-MM-DD HH:MM:SS`, and
    /// `YYYY-MM-DD` (midnight UTC).
    pub fn resolve(&self) -> Result<DateTime<Utc>, DataError> {
        match self {
            DateValue::Millis(ms) => DateTime::from_timestamp_millis(*ms)
                .ok_or_else(|| DataError::InvalidDate(format!("timestamp out of range: {ms}"))),
            DateValue::Text(s) => {
                let s = s.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return Ok(dt.with_timezone(&Utc));
                }
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                    return Ok(naive.and_utc());
                }
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                    return Ok(naive.and_utc());
                }
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
                    .map_err(|_| DataError::InvalidDate(s.to_string()))
            }
        }
    }
}

/// An OHLCV row plus the model's output for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    #[serde(flatten)]
    pub row: OhlcvRow,
    pub prediction: f64,
}

/// Model output: the input rows with a `prediction` column appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionTable {
    rows: Vec<PredictionRow>,
}

impl PredictionTable {
    pub fn new(rows: Vec<PredictionRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[PredictionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The prediction of the most recent row.
    pub fn last_prediction(&self) -> Option<f64> {
        self.rows.last().map(|r| r.prediction)
    }
}
