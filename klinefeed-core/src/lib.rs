//! klinefeed core: kline fetching, Parquet caching, and the model capability.
//!
//! - Domain types (intervals, OHLCV and prediction tables)
//! - Exchange and quote providers behind traits
//! - Chunked range fetcher and bulk downloader with fixed pacing
//! - Parquet cache
//! - Model trait with a drift baseline
//! - Config loading and tracing setup

pub mod config;
pub mod data;
pub mod domain;
pub mod logging;
pub mod model;
