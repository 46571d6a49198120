//! Provider traits, raw exchange rows, and structured error types.
//!
//! `ExchangeClient` abstracts the exchange's metadata and kline endpoints and
//! `QuoteProvider` the daily quote source, so the fetch pipeline can be driven
//! by scripted providers in tests.

use crate::domain::{Interval, OhlcvTable};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),
}

/// One kline exactly as the exchange returns it.
///
/// Wire layout is positional: `[open_time, open, high, low, close, volume,
/// close_time, quote_asset_volume, number_of_trades, taker_buy_base_volume,
/// taker_buy_quote_volume, ignore]`. Prices and volumes arrive as decimal
/// strings and stay textual until normalization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "KlineTuple")]
pub struct RawKline {
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub close_time: i64,
    pub quote_asset_volume: String,
    pub number_of_trades: u64,
    pub taker_buy_base_volume: String,
    pub taker_buy_quote_volume: String,
}

#[derive(Deserialize)]
struct KlineTuple(
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    u64,
    String,
    String,
    #[allow(dead_code)] serde_json::Value,
);

impl From<KlineTuple> for RawKline {
    fn from(t: KlineTuple) -> Self {
        Self {
            open_time: t.0,
            open: t.1,
            high: t.2,
            low: t.3,
            close: t.4,
            volume: t.5,
            close_time: t.6,
            quote_asset_volume: t.7,
            number_of_trades: t.8,
            taker_buy_base_volume: t.9,
            taker_buy_quote_volume: t.10,
        }
    }
}

/// Parameters of one kline page request. `None` fields are left out of the
/// outgoing query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KlineQuery {
    pub symbol: String,
    pub interval: Interval,
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
    pub limit: Option<u32>,
}

impl KlineQuery {
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            start_ms: None,
            end_ms: None,
            limit: None,
        }
    }

    pub fn window(mut self, start_ms: i64, end_ms: i64) -> Self {
        self.start_ms = Some(start_ms);
        self.end_ms = Some(end_ms);
        self
    }

    pub fn limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    /// Query pairs in wire order, skipping absent values.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", self.symbol.clone()),
            ("interval", self.interval.to_string()),
        ];
        if let Some(start) = self.start_ms {
            params.push(("startTime", start.to_string()));
        }
        if let Some(end) = self.end_ms {
            params.push(("endTime", end.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Exchange REST surface used by the fetch pipeline.
///
/// Implementations make exactly one upstream call per method and never retry.
pub trait ExchangeClient: Send + Sync {
    /// Human-readable name of this exchange.
    fn name(&self) -> &str;

    /// Every tradable symbol listed by the exchange metadata endpoint.
    fn list_symbols(&self) -> Result<BTreeSet<String>, DataError>;

    /// One bounded page of klines. An empty page is not an error.
    fn fetch_page(&self, query: &KlineQuery) -> Result<Vec<RawKline>, DataError>;
}

/// Daily quote source (Yahoo Finance).
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Daily OHLCV rows for a ticker over an inclusive date range.
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<OhlcvTable, DataError>;
}

/// Progress callback for multi-symbol operations.
pub trait DownloadProgress: Send {
    /// Called when starting to fetch a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol fetch completes, with the row count on success.
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: &Result<usize, DataError>,
    );

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits tracing events.
pub struct TracingProgress;

impl DownloadProgress for TracingProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::info!(symbol, "[{}/{}] processing", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(rows) => tracing::info!(symbol, rows, "symbol done"),
            Err(e) => tracing::error!(symbol, error = %e, "error processing symbol"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!(succeeded, failed, total, "download complete");
    }
}
