//! Advisory per-tool rate tracking.
//!
//! Calls are never blocked; exceeding the limit is logged and surfaced in
//! health reports.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window call counter
#[derive(Debug)]
pub struct RateWindow {
    limit: u32,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateWindow {
    /// `limit` calls per minute
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, DEFAULT_WINDOW)
    }

    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Count one call. Returns false when the call exceeds the limit.
    pub fn record(&self) -> bool {
        let now = Instant::now();
        let mut calls = self.calls.lock();
        Self::evict(&mut calls, now, self.window);
        calls.push_back(now);
        calls.len() <= self.limit as usize
    }

    /// Calls seen within the current window
    pub fn current(&self) -> usize {
        let mut calls = self.calls.lock();
        Self::evict(&mut calls, Instant::now(), self.window);
        calls.len()
    }

    pub fn is_exceeded(&self) -> bool {
        self.current() > self.limit as usize
    }

    fn evict(calls: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) >= window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_window_flags_excess_calls() {
        let window = RateWindow::per_minute(2);
        assert!(window.record());
        assert!(window.record());
        assert!(!window.is_exceeded());
        assert!(!window.record());
        assert!(window.is_exceeded());
        assert_eq!(window.current(), 3);
    }

    #[test]
    fn test_window_slides() {
        let window = RateWindow::new(1, Duration::from_millis(20));
        assert!(window.record());
        assert!(!window.record());
        thread::sleep(Duration::from_millis(30));
        assert_eq!(window.current(), 0);
        assert!(window.record());
    }
}
