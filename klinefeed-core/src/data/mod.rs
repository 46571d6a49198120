//! Market data: exchange and quote providers, normalization, chunked
//! fetching, bulk download, Parquet cache.

pub mod binance;
pub mod cache;
pub mod download;
pub mod fetcher;
pub mod normalize;
pub mod pacing;
pub mod provider;
pub mod yahoo;

pub use binance::BinanceClient;
pub use cache::{CacheKey, ParquetCache};
pub use download::{download_all, DownloadSummary};
pub use fetcher::{
    parse_date, resolve_range, ChunkedFetcher, DefaultRangeMode, DefaultRangePolicy, FetchOutcome,
    FetchRequest, RangeBounds,
};
pub use normalize::normalize;
pub use pacing::Pacing;
pub use provider::{
    DataError, DownloadProgress, ExchangeClient, KlineQuery, QuoteProvider, RawKline,
    TracingProgress,
};
pub use yahoo::YahooProvider;
