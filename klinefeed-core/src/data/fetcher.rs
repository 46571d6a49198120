//! Chunked fetch orchestrator.
//!
//! Walks a `[start, end)` range in windows of at most `chunk_span_ms`, pulls
//! one kline page per window, advances past the last returned close time,
//! then normalizes the accumulated pages and writes them to the Parquet cache.
//!
//! Page failures are not fatal: the loop stops and whatever was accumulated
//! is still normalized, cached and returned.

use super::cache::{CacheKey, ParquetCache};
use super::normalize::normalize;
use super::pacing::Pacing;
use super::provider::{DataError, ExchangeClient, KlineQuery, RawKline};
use crate::domain::{Interval, OhlcvTable};
use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// 30 days, the default window per page.
pub const DEFAULT_CHUNK_SPAN_MS: i64 = 30 * DAY_MS;

/// How the end boundary is derived when a request carries no end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultRangeMode {
    /// `end = start - N months`. The end lands before the start, so the
    /// fetch loop never runs and the result is empty. Kept for compatibility
    /// with existing callers that rely on the no-op.
    #[default]
    Legacy,
    /// The window becomes `[start - N months, start]`.
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultRangePolicy {
    pub mode: DefaultRangeMode,
    pub months: u32,
}

impl Default for DefaultRangePolicy {
    fn default() -> Self {
        Self {
            mode: DefaultRangeMode::Legacy,
            months: 6,
        }
    }
}

/// One range fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbol: String,
    pub interval: Interval,
    /// Inclusive calendar date, UTC midnight. `None` means "now".
    pub start_date: Option<NaiveDate>,
    /// Calendar date, UTC midnight. `None` defers to the range policy.
    pub end_date: Option<NaiveDate>,
    pub chunk_span_ms: i64,
}

impl FetchRequest {
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            start_date: None,
            end_date: None,
            chunk_span_ms: DEFAULT_CHUNK_SPAN_MS,
        }
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn chunk_span_ms(mut self, span_ms: i64) -> Self {
        self.chunk_span_ms = span_ms;
        self
    }
}

/// Resolved epoch-millisecond boundaries of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBounds {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl RangeBounds {
    /// True when the fetch loop has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.start_ms >= self.end_ms
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| DataError::InvalidDate(format!("'{s}': {e}")))
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn months_before(dt: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>, DataError> {
    dt.checked_sub_months(Months::new(months))
        .ok_or_else(|| DataError::InvalidDate(format!("{dt} minus {months} months is out of range")))
}

/// Turn a request's optional dates into millisecond boundaries.
pub fn resolve_range(
    request: &FetchRequest,
    now: DateTime<Utc>,
    policy: DefaultRangePolicy,
) -> Result<RangeBounds, DataError> {
    let start = request.start_date.map(midnight_utc).unwrap_or(now);

    let (start, end) = match request.end_date {
        Some(end) => (start, midnight_utc(end)),
        None => match policy.mode {
            DefaultRangeMode::Legacy => (start, months_before(start, policy.months)?),
            DefaultRangeMode::Trailing => (months_before(start, policy.months)?, start),
        },
    };

    Ok(RangeBounds {
        start_ms: start.timestamp_millis(),
        end_ms: end.timestamp_millis(),
    })
}

/// Result of one fetch: the normalized table and its cache file.
///
/// `path` is `None` when no page returned rows and nothing was written.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub table: OhlcvTable,
    pub path: Option<PathBuf>,
}

/// Drives an [`ExchangeClient`] across a full range and caches the result.
pub struct ChunkedFetcher<'a> {
    client: &'a dyn ExchangeClient,
    cache: &'a ParquetCache,
    pacing: Pacing,
    range_policy: DefaultRangePolicy,
    page_limit: Option<u32>,
}

impl<'a> ChunkedFetcher<'a> {
    pub fn new(client: &'a dyn ExchangeClient, cache: &'a ParquetCache) -> Self {
        Self {
            client,
            cache,
            pacing: Pacing::default(),
            range_policy: DefaultRangePolicy::default(),
            page_limit: Some(super::binance::MAX_PAGE_LIMIT),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_range_policy(mut self, policy: DefaultRangePolicy) -> Self {
        self.range_policy = policy;
        self
    }

    pub fn with_page_limit(mut self, limit: Option<u32>) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn client(&self) -> &dyn ExchangeClient {
        self.client
    }

    pub fn cache(&self) -> &ParquetCache {
        self.cache
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Fetch a request's range as of the current time.
    pub fn fetch_range(&self, request: &FetchRequest) -> Result<OhlcvTable, DataError> {
        self.fetch_range_at(request, Utc::now())
    }

    /// Fetch a request's range, resolving absent dates against `now`.
    pub fn fetch_range_at(
        &self,
        request: &FetchRequest,
        now: DateTime<Utc>,
    ) -> Result<OhlcvTable, DataError> {
        self.fetch_outcome_at(request, now).map(|outcome| outcome.table)
    }

    /// Like [`fetch_range_at`](Self::fetch_range_at), but also reports where
    /// the table was cached.
    ///
    /// Only normalization and cache-write failures are returned as errors.
    pub fn fetch_outcome_at(
        &self,
        request: &FetchRequest,
        now: DateTime<Utc>,
    ) -> Result<FetchOutcome, DataError> {
        if request.chunk_span_ms <= 0 {
            return Err(DataError::InvalidRequest(format!(
                "chunk span must be positive, got {} ms",
                request.chunk_span_ms
            )));
        }

        let bounds = resolve_range(request, now, self.range_policy)?;
        let key = CacheKey::new(
            request.symbol.clone(),
            request.interval,
            Some(bounds.start_ms),
            Some(bounds.end_ms),
        );

        if bounds.is_empty() {
            tracing::warn!(
                symbol = %request.symbol,
                start_ms = bounds.start_ms,
                end_ms = bounds.end_ms,
                "range end is not after its start; nothing to fetch"
            );
        }

        let pages = self.collect_pages(request, bounds);
        if pages.is_empty() {
            return Ok(FetchOutcome {
                table: OhlcvTable::empty(),
                path: None,
            });
        }

        let table = normalize(&pages)?;
        let path = self.cache.write(&key, &table)?;
        tracing::info!(
            symbol = %request.symbol,
            rows = table.len(),
            path = %path.display(),
            "saved data"
        );
        Ok(FetchOutcome {
            table,
            path: Some(path),
        })
    }

    fn collect_pages(&self, request: &FetchRequest, bounds: RangeBounds) -> Vec<RawKline> {
        let mut all = Vec::new();
        let mut current_start = bounds.start_ms;

        while current_start < bounds.end_ms {
            let current_end = current_start
                .saturating_add(request.chunk_span_ms)
                .min(bounds.end_ms);

            tracing::info!(
                symbol = %request.symbol,
                from = %fmt_ms(current_start),
                to = %fmt_ms(current_end),
                "fetching chunk"
            );

            let query = KlineQuery::new(request.symbol.clone(), request.interval)
                .window(current_start, current_end)
                .limit(self.page_limit);

            let page = match self.client.fetch_page(&query) {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(symbol = %request.symbol, error = %e, "error fetching data");
                    break;
                }
            };

            let Some(last_close) = page.last().map(|k| k.close_time) else {
                tracing::info!(symbol = %request.symbol, "no more data available");
                break;
            };

            all.extend(page);

            let next_start = last_close.saturating_add(1);
            if next_start <= current_start {
                tracing::warn!(
                    symbol = %request.symbol,
                    last_close,
                    "page did not advance past the window start; stopping"
                );
                break;
            }
            current_start = next_start;

            self.pacing.pause_after_page();
        }

        all
    }
}

fn fmt_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}
