//! Bulk downloader: runs the chunked fetcher over every listed symbol.

use super::fetcher::{ChunkedFetcher, FetchRequest};
use super::provider::{DataError, DownloadProgress};
use crate::domain::Interval;

/// Download every symbol the exchange lists, one at a time, with the
/// request's default date range.
///
/// A symbol listing failure aborts before any fetch. A failure on one
/// symbol is recorded and the loop moves on.
pub fn download_all(
    fetcher: &ChunkedFetcher<'_>,
    interval: Interval,
    period_label: &str,
    progress: &dyn DownloadProgress,
) -> Result<DownloadSummary, DataError> {
    let symbols = fetcher.client().list_symbols().map_err(|e| {
        tracing::error!(error = %e, "error fetching symbols");
        e
    })?;
    let symbols: Vec<String> = symbols.into_iter().collect();
    tracing::info!(count = symbols.len(), period = period_label, %interval, "found symbols");

    let total = symbols.len();
    let mut summary = DownloadSummary {
        period_label: period_label.to_string(),
        interval,
        total,
        succeeded: 0,
        failed: 0,
        rows: Vec::new(),
        errors: Vec::new(),
    };

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        let request = FetchRequest::new(symbol.clone(), interval);
        let result = fetcher.fetch_range(&request).map(|table| table.len());
        progress.on_complete(symbol, i, total, &result);

        match result {
            Ok(rows) => {
                summary.succeeded += 1;
                summary.rows.push((symbol.clone(), rows));
            }
            Err(e) => {
                summary.failed += 1;
                summary.errors.push((symbol.clone(), e));
            }
        }

        fetcher.pacing().pause_after_symbol();
    }

    progress.on_batch_complete(summary.succeeded, summary.failed, total);
    Ok(summary)
}

/// Summary of a bulk download.
#[derive(Debug)]
pub struct DownloadSummary {
    pub period_label: String,
    pub interval: Interval,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows fetched per successful symbol.
    pub rows: Vec<(String, usize)>,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn total_rows(&self) -> usize {
        self.rows.iter().map(|(_, n)| n).sum()
    }
}
