//! Parquet cache of fetched OHLCV tables.
//!
//! Layout: `{cache_dir}/{SYMBOL}_{start}_to_{end}_{interval}.parquet`, one
//! file per table identity. Writes always overwrite and are atomic (write to
//! `.tmp`, rename into place). The fetch path never reads entries back;
//! `load` exists for downstream consumers.

use super::provider::DataError;
use crate::domain::{Interval, OhlcvRow, OhlcvTable};
use chrono::DateTime;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Identity of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub symbol: String,
    pub interval: Interval,
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

impl CacheKey {
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            start_ms,
            end_ms,
        }
    }

    /// `{symbol}_{start}_to_{end}_{interval}.parquet`, boundaries as UTC
    /// `YYYY-MM-DD`, or `start` / `end` when a boundary is absent.
    pub fn file_name(&self) -> String {
        let start = date_token(self.start_ms, "start");
        let end = date_token(self.end_ms, "end");
        format!(
            "{}_{start}_to_{end}_{}.parquet",
            self.symbol, self.interval
        )
    }
}

fn date_token(ms: Option<i64>, absent: &str) -> String {
    ms.and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| absent.to_string())
}

/// The Parquet cache.
#[derive(Debug, Clone)]
pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Full path of the file for a key.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.file_name())
    }

    /// Write a table, replacing any existing entry for the same key.
    pub fn write(&self, key: &CacheKey, table: &OhlcvTable) -> Result<PathBuf, DataError> {
        if table.is_empty() {
            return Err(DataError::Cache("no rows to cache".into()));
        }

        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::Cache(format!("failed to create dir: {e}")))?;

        let mut df = table_to_dataframe(table)?;
        let path = self.entry_path(key);
        let tmp_path = path.with_extension("parquet.tmp");

        write_parquet(&mut df, &tmp_path)?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Cache(format!("atomic rename failed: {e}"))
        })?;

        Ok(path)
    }

    /// Read an entry back.
    pub fn load(&self, key: &CacheKey) -> Result<OhlcvTable, DataError> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Err(DataError::Cache(format!(
                "no cache entry at {}",
                path.display()
            )));
        }
        load_parquet(&path)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Convert a table to a Polars DataFrame with a millisecond `date` column.
pub fn table_to_dataframe(table: &OhlcvTable) -> Result<DataFrame, DataError> {
    let rows = table.rows();
    let dates: Vec<i64> = rows.iter().map(|r| r.timestamp_ms()).collect();
    let opens: Vec<f64> = rows.iter().map(|r| r.open).collect();
    let highs: Vec<f64> = rows.iter().map(|r| r.high).collect();
    let lows: Vec<f64> = rows.iter().map(|r| r.low).collect();
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let volumes: Vec<f64> = rows.iter().map(|r| r.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| DataError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file = fs::File::create(path).map_err(|e| DataError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load a Parquet file written by [`ParquetCache::write`].
pub fn load_parquet(path: &Path) -> Result<OhlcvTable, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::Parquet(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Parquet(format!("read: {e}")))?;

    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(DataError::Parquet(format!("missing column '{name}'")));
        }
    }

    dataframe_to_table(&df)
}

fn dataframe_to_table(df: &DataFrame) -> Result<OhlcvTable, DataError> {
    let map_err = |e: PolarsError| DataError::Parquet(format!("column read: {e}"));

    let dates = df
        .column("date")
        .map_err(map_err)?
        .cast(&DataType::Int64)
        .map_err(map_err)?;
    let date_ca = dates.i64().map_err(map_err)?;
    let open_ca = df.column("open").map_err(map_err)?.f64().map_err(map_err)?;
    let high_ca = df.column("high").map_err(map_err)?.f64().map_err(map_err)?;
    let low_ca = df.column("low").map_err(map_err)?.f64().map_err(map_err)?;
    let close_ca = df.column("close").map_err(map_err)?.f64().map_err(map_err)?;
    let vol_ca = df.column("volume").map_err(map_err)?.f64().map_err(map_err)?;

    let n = df.height();
    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let ms = date_ca
            .get(i)
            .ok_or_else(|| DataError::Parquet(format!("null date at row {i}")))?;
        let date = DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| DataError::Parquet(format!("date out of range at row {i}")))?;

        rows.push(OhlcvRow {
            date,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(f64::NAN),
        });
    }

    Ok(OhlcvTable::new(rows))
}
