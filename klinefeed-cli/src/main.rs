//! klinefeed CLI: list symbols, fetch one range, bulk download.
//!
//! Commands:
//! - `symbols`: print every tradable symbol the exchange lists
//! - `fetch`: fetch one symbol's klines over a date range and cache as Parquet
//! - `download-all`: fetch every listed symbol with the default range

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use klinefeed_core::config::AppConfig;
use klinefeed_core::data::{
    download_all, parse_date, BinanceClient, ChunkedFetcher, DefaultRangeMode, DownloadSummary,
    ExchangeClient, FetchRequest, ParquetCache, TracingProgress,
};
use klinefeed_core::domain::Interval;
use klinefeed_core::logging::init_tracing;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "klinefeed",
    about = "klinefeed CLI, exchange kline fetching into a Parquet cache"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory. Overrides the config file.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every tradable symbol, one per line.
    Symbols,
    /// Fetch one symbol over a date range and cache it as Parquet.
    Fetch {
        /// Symbol to fetch (e.g., BTCUSDT).
        symbol: String,

        /// Candle interval (1m, 5m, 1h, 1d, ...).
        #[arg(long, default_value = "1m")]
        interval: Interval,

        /// Start date (YYYY-MM-DD). Defaults to now.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to the configured range policy.
        #[arg(long)]
        end: Option<String>,

        /// Days of data requested per page.
        #[arg(long)]
        chunk_days: Option<u32>,

        /// Without --end, fetch the trailing months before the start instead
        /// of the legacy empty range.
        #[arg(long, default_value_t = false)]
        trailing: bool,
    },
    /// Fetch every listed symbol with the default range.
    DownloadAll {
        /// Candle interval.
        #[arg(long, default_value = "1d")]
        interval: Interval,

        /// Label recorded in logs and the summary.
        #[arg(long, default_value = "6_months")]
        period: String,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.cache_dir {
        config.fetch.cache_dir = dir;
    }

    let client = BinanceClient::new(&config.exchange.base_url, config.exchange.timeout())?;
    let cache = ParquetCache::new(&config.fetch.cache_dir);

    match cli.command {
        Commands::Symbols => run_symbols(&client),
        Commands::Fetch {
            symbol,
            interval,
            start,
            end,
            chunk_days,
            trailing,
        } => {
            if let Some(days) = chunk_days {
                config.fetch.chunk_span_days = days;
            }
            if trailing {
                config.fetch.default_range.mode = DefaultRangeMode::Trailing;
            }
            run_fetch(&client, &cache, &config, symbol, interval, start, end)
        }
        Commands::DownloadAll { interval, period } => {
            run_download_all(&client, &cache, &config, interval, &period)
        }
    }
}

fn fetcher<'a>(
    client: &'a dyn ExchangeClient,
    cache: &'a ParquetCache,
    config: &AppConfig,
) -> ChunkedFetcher<'a> {
    ChunkedFetcher::new(client, cache)
        .with_pacing(config.fetch.pacing())
        .with_range_policy(config.fetch.default_range)
        .with_page_limit(config.fetch.page_limit)
}

fn run_symbols(client: &dyn ExchangeClient) -> Result<()> {
    let symbols = client.list_symbols()?;
    for symbol in &symbols {
        println!("{symbol}");
    }
    eprintln!("{} symbols", symbols.len());
    Ok(())
}

fn run_fetch(
    client: &dyn ExchangeClient,
    cache: &ParquetCache,
    config: &AppConfig,
    symbol: String,
    interval: Interval,
    start: Option<String>,
    end: Option<String>,
) -> Result<()> {
    if config.fetch.chunk_span_days == 0 {
        bail!("--chunk-days must be at least 1");
    }

    let mut request =
        FetchRequest::new(symbol, interval).chunk_span_ms(config.fetch.chunk_span_ms());
    request.start_date = start.as_deref().map(parse_date).transpose()?;
    request.end_date = end.as_deref().map(parse_date).transpose()?;

    let outcome = fetcher(client, cache, config).fetch_outcome_at(&request, Utc::now())?;

    match outcome.path {
        Some(path) => println!(
            "{}: {} rows -> {}",
            request.symbol,
            outcome.table.len(),
            path.display()
        ),
        None => println!("{}: no rows fetched; nothing cached", request.symbol),
    }
    Ok(())
}

fn run_download_all(
    client: &dyn ExchangeClient,
    cache: &ParquetCache,
    config: &AppConfig,
    interval: Interval,
    period: &str,
) -> Result<()> {
    let summary = download_all(&fetcher(client, cache, config), interval, period, &TracingProgress)?;
    report_summary(&summary);

    if !summary.all_succeeded() {
        std::process::exit(1);
    }

    Ok(())
}

/// Print the bulk-download totals and log each failed symbol.
fn report_summary(summary: &DownloadSummary) {
    tracing::info!(
        period = %summary.period_label,
        interval = %summary.interval,
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        rows = summary.total_rows(),
        "download summary"
    );

    println!();
    println!("Period:    {} ({})", summary.period_label, summary.interval);
    println!("Symbols:   {}", summary.total);
    println!("Succeeded: {}", summary.succeeded);
    println!("Failed:    {}", summary.failed);
    println!("Rows:      {}", summary.total_rows());

    for (symbol, err) in &summary.errors {
        tracing::error!(%symbol, error = %err, "symbol failed");
        eprintln!("Error for {symbol}: {err}");
    }
}
