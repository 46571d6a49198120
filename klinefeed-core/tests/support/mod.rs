//! Scripted exchange client for driving the fetch pipeline offline.

#![allow(dead_code)]

use chrono::NaiveDate;
use klinefeed_core::data::fetcher::DAY_MS;
use klinefeed_core::data::{DataError, ExchangeClient, KlineQuery, RawKline};
use std::collections::{BTreeSet, HashSet};
use std::sync::Mutex;

/// Serves one daily kline per day inside each requested window and records
/// every query it receives.
#[derive(Default)]
pub struct ScriptedClient {
    pub symbols: Vec<String>,
    pub fail_listing: bool,
    /// 1-based call number whose page request errors.
    pub fail_on_call: Option<usize>,
    /// 1-based call number from which pages come back empty.
    pub empty_from_call: Option<usize>,
    /// Symbols whose pages carry an unparseable price.
    pub malformed_symbols: HashSet<String>,
    pub queries: Mutex<Vec<KlineQuery>>,
    /// `close_time` of every kline served, in serving order.
    pub served_close_times: Mutex<Vec<i64>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbols(symbols: &[&str]) -> Self {
        Self {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<KlineQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn served_close_times(&self) -> Vec<i64> {
        self.served_close_times.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.symbol == symbol)
            .count()
    }
}

impl ExchangeClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    fn list_symbols(&self) -> Result<BTreeSet<String>, DataError> {
        if self.fail_listing {
            return Err(DataError::UpstreamUnavailable("exchangeInfo: HTTP 503".into()));
        }
        Ok(self.symbols.iter().cloned().collect())
    }

    fn fetch_page(&self, query: &KlineQuery) -> Result<Vec<RawKline>, DataError> {
        let call = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.clone());
            queries.len()
        };

        if self.fail_on_call == Some(call) {
            return Err(DataError::UpstreamUnavailable("klines: HTTP 502".into()));
        }
        if self.empty_from_call.is_some_and(|n| call >= n) {
            return Ok(Vec::new());
        }

        let malformed = self.malformed_symbols.contains(&query.symbol);
        let (Some(start), Some(end)) = (query.start_ms, query.end_ms) else {
            return Ok(Vec::new());
        };

        let mut page = Vec::new();
        let mut open_time = start;
        while open_time < end {
            if query.limit.is_some_and(|l| page.len() >= l as usize) {
                break;
            }
            page.push(kline(open_time, malformed));
            open_time += DAY_MS;
        }
        self.served_close_times
            .lock()
            .unwrap()
            .extend(page.iter().map(|k| k.close_time));
        Ok(page)
    }
}

pub fn kline(open_time: i64, malformed: bool) -> RawKline {
    let price = (open_time / DAY_MS) as f64;
    RawKline {
        open_time,
        open: if malformed { "n/a".into() } else { price.to_string() },
        high: (price + 1.0).to_string(),
        low: (price - 1.0).to_string(),
        close: (price + 0.5).to_string(),
        volume: "10".into(),
        close_time: open_time + DAY_MS - 1,
        quote_asset_volume: "0".into(),
        number_of_trades: 1,
        taker_buy_base_volume: "0".into(),
        taker_buy_quote_volume: "0".into(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn midnight_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis()
}
