use klinefeed_core::config::AppConfig;
use klinefeed_core::data::{BinanceClient, ExchangeClient, ParquetCache, QuoteProvider, YahooProvider};
use klinefeed_core::model::{create_model, Model};
use std::sync::Arc;

/// Shared application state, passed to all route handlers via `axum::extract::State`.
pub struct AppState {
    pub config: AppConfig,
    /// The active model, built once at startup.
    pub model: Arc<dyn Model>,
    pub exchange: Arc<dyn ExchangeClient>,
    pub quotes: Arc<dyn QuoteProvider>,
    pub cache: ParquetCache,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        model: Arc<dyn Model>,
        exchange: Arc<dyn ExchangeClient>,
        quotes: Arc<dyn QuoteProvider>,
    ) -> Arc<Self> {
        let cache = ParquetCache::new(&config.fetch.cache_dir);
        Arc::new(Self {
            config,
            model,
            exchange,
            quotes,
            cache,
        })
    }

    /// Build the production state: Binance exchange client, Yahoo quotes,
    /// and the configured model.
    ///
    /// The HTTP clients are blocking; call this off the async runtime.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Arc<Self>> {
        let model = create_model(&config.model)?;
        let exchange = BinanceClient::new(&config.exchange.base_url, config.exchange.timeout())?;
        let quotes = YahooProvider::new(&config.quote.base_url, config.quote.timeout())?;
        Ok(Self::new(config, model, Arc::new(exchange), Arc::new(quotes)))
    }
}
