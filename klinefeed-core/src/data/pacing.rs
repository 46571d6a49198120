//! Fixed-delay pacing between upstream calls.
//!
//! The pipeline's only rate limiting: a pause after every kline page and
//! after every symbol in a bulk run. No backoff, no token bucket.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub page_delay: Duration,
    pub symbol_delay: Duration,
}

impl Pacing {
    pub fn new(page_delay: Duration, symbol_delay: Duration) -> Self {
        Self {
            page_delay,
            symbol_delay,
        }
    }

    /// No pauses at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn pause_after_page(&self) {
        pause(self.page_delay);
    }

    pub fn pause_after_symbol(&self) {
        pause(self.symbol_delay);
    }
}

impl Default for Pacing {
    /// 200 ms between pages, 1 s between symbols.
    fn default() -> Self {
        Self::new(Duration::from_millis(200), Duration::from_secs(1))
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn none_does_not_sleep() {
        let pacing = Pacing::none();
        let started = Instant::now();
        for _ in 0..100 {
            pacing.pause_after_page();
            pacing.pause_after_symbol();
        }
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn page_pause_waits_at_least_delay() {
        let pacing = Pacing::new(Duration::from_millis(15), Duration::ZERO);
        let started = Instant::now();
        pacing.pause_after_page();
        assert!(started.elapsed() >= Duration::from_millis(15));
    }
}
