//! Yahoo Finance daily quote provider.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API. One request per call;
//! no retries and no circuit breaking.

use super::provider::{DataError, QuoteProvider};
use crate::domain::{OhlcvRow, OhlcvTable};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance quote provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::UpstreamUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<String, DataError> {
        let start_ts = start
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| DataError::InvalidDate(start.to_string()))?
            .and_utc()
            .timestamp();
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| DataError::InvalidDate(end.to_string()))?
            .and_utc()
            .timestamp();
        Ok(format!(
            "{}/v8/finance/chart/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d",
            self.base_url
        ))
    }

    /// Parse the chart API response into OHLCV rows, dropping incomplete days.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<OhlcvTable, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::MalformedPayload(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::MalformedPayload("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::MalformedPayload("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::MalformedPayload("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::MalformedPayload("no quote data".into()))?;

        let mut rows = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| DataError::MalformedPayload(format!("invalid timestamp: {ts}")))?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Holidays/non-trading days come back as all-null rows
            if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none() {
                continue;
            }

            rows.push(OhlcvRow {
                date,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close: close.unwrap_or(f64::NAN),
                volume: volume.unwrap_or(f64::NAN),
            });
        }

        let table = OhlcvTable::new(rows).drop_missing();
        if table.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(table)
    }
}

impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<OhlcvTable, DataError> {
        let url = self.chart_url(ticker, start, end)?;
        tracing::info!(ticker, %start, %end, "fetching daily quotes");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::UpstreamUnavailable(format!("{url}: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::UpstreamUnavailable(format!(
                "HTTP {status} for {ticker}"
            )));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::MalformedPayload(format!("failed to parse response for {ticker}: {e}"))
        })?;

        Self::parse_response(ticker, chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart(value: serde_json::Value) -> ChartResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_rows_and_drops_incomplete_days() {
        let resp = chart(json!({
            "chart": {
                "result": [{
                    "timestamp": [1725580800, 1725667200, 1725753600, 1725840000],
                    "indicators": {
                        "quote": [{
                            "open":   [2400.0, null, 2450.0, 2500.0],
                            "high":   [2500.0, null, 2550.0, 2600.0],
                            "low":    [2300.0, null, null,   2400.0],
                            "close":  [2450.0, null, 2500.0, 2550.0],
                            "volume": [1000,   null, 1200,   1300]
                        }]
                    }
                }],
                "error": null
            }
        }));

        let table = YahooProvider::parse_response("ETH-USD", resp).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.first().unwrap().date.timestamp(), 1725580800);
        assert_eq!(table.last().unwrap().close, 2550.0);
        assert_eq!(table.last().unwrap().volume, 1300.0);
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let resp = chart(json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found"}
            }
        }));
        let err = YahooProvider::parse_response("NOPE", resp).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { symbol } if symbol == "NOPE"));
    }

    #[test]
    fn other_chart_errors_are_malformed() {
        let resp = chart(json!({
            "chart": {
                "result": null,
                "error": {"code": "Bad Request", "description": "Invalid input"}
            }
        }));
        assert!(matches!(
            YahooProvider::parse_response("ETH-USD", resp),
            Err(DataError::MalformedPayload(_))
        ));
    }

    #[test]
    fn chart_url_covers_whole_end_day() {
        let provider = YahooProvider::new("http://localhost/", Duration::from_secs(1)).unwrap();
        let url = provider
            .chart_url(
                "ETH-USD",
                NaiveDate::from_ymd_opt(2024, 9, 6).unwrap(),
                NaiveDate::from_ymd_opt(2024, 9, 10).unwrap(),
            )
            .unwrap();
        assert_eq!(
            url,
            "http://localhost/v8/finance/chart/ETH-USD?period1=1725580800&period2=1726012799&interval=1d"
        );
    }
}
