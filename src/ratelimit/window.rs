//! Fixed-window accounting state.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Time unit for expressing a window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Per-second rate limiting
    Second,
    /// Per-minute rate limiting
    Minute,
    /// Per-hour rate limiting
    Hour,
    /// Per-day rate limiting
    Day,
}

impl TimeWindow {
    /// Get the duration of this time window.
    pub fn duration(&self) -> Duration {
        match self {
            TimeWindow::Second => Duration::from_secs(1),
            TimeWindow::Minute => Duration::from_secs(60),
            TimeWindow::Hour => Duration::from_secs(3600),
            TimeWindow::Day => Duration::from_secs(86400),
        }
    }
}

/// The current accounting period of a limiter.
///
/// This type is not synchronized on its own; [`RateLimiter`](super::RateLimiter)
/// keeps it behind a single lock so that rollover, the capacity check and the
/// increment happen as one step.
#[derive(Debug, Clone)]
pub struct RateLimitWindow {
    /// When the current window started
    window_start: Instant,
    /// Admissions granted since `window_start`
    count: u64,
}

impl RateLimitWindow {
    /// Open an empty window starting at `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            window_start: start,
            count: 0,
        }
    }

    /// Start of the current window.
    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    /// Admissions granted in the current window.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// End of the current window, i.e. the next rollover boundary.
    pub fn window_end(&self, duration: Duration) -> Instant {
        self.window_start + duration
    }

    /// Time left until the next rollover boundary, as seen from `now`.
    pub fn remaining_time(&self, now: Instant, duration: Duration) -> Duration {
        self.window_end(duration).saturating_duration_since(now)
    }

    /// Roll the window forward if `now` is past its end.
    ///
    /// The start advances by a whole number of window lengths, so boundaries
    /// stay aligned to the first window no matter how late the check comes.
    /// Returns `true` if a rollover happened.
    pub fn roll_forward(&mut self, now: Instant, duration: Duration) -> bool {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < duration {
            return false;
        }

        let windows = elapsed.as_nanos() / duration.as_nanos();
        // windows * duration <= elapsed, so this never overflows what elapsed held
        let advance = Duration::from_nanos((windows * duration.as_nanos()) as u64);

        self.window_start += advance;
        self.count = 0;
        true
    }

    /// Claim one slot if fewer than `limit` have been claimed.
    ///
    /// Returns the 1-based sequence number of the claimed slot, or `None`
    /// when the window is saturated. A refusal leaves the count untouched.
    pub fn try_admit(&mut self, limit: u64) -> Option<u64> {
        if self.count < limit {
            self.count += 1;
            Some(self.count)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_window_duration() {
        assert_eq!(TimeWindow::Second.duration(), Duration::from_secs(1));
        assert_eq!(TimeWindow::Minute.duration(), Duration::from_secs(60));
        assert_eq!(TimeWindow::Hour.duration(), Duration::from_secs(3600));
        assert_eq!(TimeWindow::Day.duration(), Duration::from_secs(86400));
    }

    #[test]
    fn test_time_window_deserialize_lowercase() {
        let unit: TimeWindow = serde_yaml::from_str("minute").unwrap();
        assert_eq!(unit, TimeWindow::Minute);
    }

    #[test]
    fn test_try_admit_stops_at_limit() {
        let mut window = RateLimitWindow::new(Instant::now());

        assert_eq!(window.try_admit(3), Some(1));
        assert_eq!(window.try_admit(3), Some(2));
        assert_eq!(window.try_admit(3), Some(3));

        // Refusal must not move the count
        assert_eq!(window.try_admit(3), None);
        assert_eq!(window.count(), 3);
    }

    #[test]
    fn test_no_rollover_inside_window() {
        let start = Instant::now();
        let mut window = RateLimitWindow::new(start);
        window.try_admit(5);

        let rolled =
            window.roll_forward(start + Duration::from_millis(999), Duration::from_secs(1));

        assert!(!rolled);
        assert_eq!(window.count(), 1);
        assert_eq!(window.window_start(), start);
    }

    #[test]
    fn test_rollover_resets_count_at_boundary() {
        let start = Instant::now();
        let mut window = RateLimitWindow::new(start);
        window.try_admit(5);
        window.try_admit(5);

        assert!(window.roll_forward(start + Duration::from_secs(1), Duration::from_secs(1)));
        assert_eq!(window.count(), 0);
        assert_eq!(window.window_start(), start + Duration::from_secs(1));
    }

    #[test]
    fn test_rollover_stays_aligned_after_idle_windows() {
        let start = Instant::now();
        let mut window = RateLimitWindow::new(start);

        // 3.5 windows later the start lands on the third boundary, not on `now`
        let now = start + Duration::from_millis(3500);
        assert!(window.roll_forward(now, Duration::from_secs(1)));
        assert_eq!(window.window_start(), start + Duration::from_secs(3));
        assert_eq!(
            window.remaining_time(now, Duration::from_secs(1)),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_window_start_is_monotonic() {
        let start = Instant::now();
        let mut window = RateLimitWindow::new(start);
        let mut last = window.window_start();

        for step in [250u64, 1200, 900, 5000, 10, 3333] {
            window.roll_forward(last + Duration::from_millis(step), Duration::from_secs(1));
            assert!(window.window_start() >= last);
            last = window.window_start();
        }

        // A stale `now` earlier than the start is ignored
        assert!(!window.roll_forward(start, Duration::from_secs(1)));
        assert_eq!(window.window_start(), last);
    }
}
