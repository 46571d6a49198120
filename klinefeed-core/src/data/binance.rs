//! Binance USDⓈ-M futures REST client.
//!
//! Two endpoints: `exchangeInfo` for the symbol list and `klines` for candle
//! pages. One request per call, no retries; pacing between calls is the
//! caller's job.

use super::provider::{DataError, ExchangeClient, KlineQuery, RawKline};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";

/// Largest page the klines endpoint will serve.
pub const MAX_PAGE_LIMIT: u32 = 1500;

const EXCHANGE_INFO_PATH: &str = "/fapi/v1/exchangeInfo";
const KLINES_PATH: &str = "/fapi/v1/klines";

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
}

/// Blocking Binance futures client.
pub struct BinanceClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::UpstreamUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `{base_url}{path}` and decode the JSON body.
    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, DataError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Fetching data using URL: {}", display_url(&url, params));

        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .map_err(|e| DataError::UpstreamUnavailable(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::UpstreamUnavailable(format!(
                "HTTP {status} from {url}"
            )));
        }

        resp.json::<T>()
            .map_err(|e| DataError::MalformedPayload(format!("failed to decode {url}: {e}")))
    }
}

/// `url` with its query string, as logged before each request.
fn display_url(url: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{url}?{query}")
}

impl ExchangeClient for BinanceClient {
    fn name(&self) -> &str {
        "binance_futures"
    }

    fn list_symbols(&self) -> Result<BTreeSet<String>, DataError> {
        let info: ExchangeInfo = self.get_json(EXCHANGE_INFO_PATH, &[])?;
        Ok(info.symbols.into_iter().map(|s| s.symbol).collect())
    }

    fn fetch_page(&self, query: &KlineQuery) -> Result<Vec<RawKline>, DataError> {
        self.get_json(KLINES_PATH, &query.params())
    }
}
