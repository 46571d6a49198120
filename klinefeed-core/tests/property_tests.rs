//! Property tests for fetch pipeline invariants.
//!
//! 1. Page count: an explicit range issues exactly ceil(range / span) pages
//! 2. Coverage: every window lies inside the range and windows are contiguous
//! 3. Ordering: the fetched table is strictly ascending by date

mod support;

use chrono::{DateTime, Utc};
use klinefeed_core::data::fetcher::DAY_MS;
use klinefeed_core::data::{ChunkedFetcher, FetchRequest, Pacing, ParquetCache};
use klinefeed_core::domain::Interval;
use proptest::prelude::*;
use support::{date, midnight_ms, ScriptedClient};

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(midnight_ms(date(2025, 1, 1))).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn explicit_range_pages_cover_range_in_order(
        offset_days in 0i64..300,
        range_days in 1i64..200,
        span_days in 1i64..60,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let client = ScriptedClient::new();
        let fetcher = ChunkedFetcher::new(&client, &cache).with_pacing(Pacing::none());

        let start = date(2023, 1, 1) + chrono::Duration::days(offset_days);
        let end = start + chrono::Duration::days(range_days);
        let request = FetchRequest::new("BTCUSDT", Interval::OneDay)
            .between(start, end)
            .chunk_span_ms(span_days * DAY_MS);

        let table = fetcher.fetch_range_at(&request, now()).unwrap();
        let queries = client.queries();

        let expected_pages = (range_days + span_days - 1) / span_days;
        prop_assert_eq!(queries.len() as i64, expected_pages);

        let (start_ms, end_ms) = (midnight_ms(start), midnight_ms(end));
        prop_assert_eq!(queries[0].start_ms, Some(start_ms));
        prop_assert_eq!(queries.last().unwrap().end_ms, Some(end_ms));
        for q in &queries {
            prop_assert!(q.start_ms.unwrap() >= start_ms);
            prop_assert!(q.end_ms.unwrap() <= end_ms);
        }
        for pair in queries.windows(2) {
            prop_assert_eq!(pair[0].end_ms, pair[1].start_ms);
        }

        prop_assert_eq!(table.len() as i64, range_days);
        prop_assert!(table.is_strictly_ascending());
        let dates: Vec<i64> = table.rows().iter().map(|r| r.timestamp_ms()).collect();
        prop_assert_eq!(dates, client.served_close_times());
    }
}
