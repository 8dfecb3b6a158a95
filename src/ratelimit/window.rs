//! Fixed-window counter table.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-identity request counts for the current window.
///
/// All counts share one window: when it elapses the whole table is cleared at
/// once and a new window starts. Callers serialize access.
#[derive(Debug)]
pub struct FixedWindow {
    /// Length of every window
    period: Duration,
    /// When the current window started
    started_at: Instant,
    /// Requests seen in the current window, by identity
    counts: HashMap<String, u64>,
}

impl FixedWindow {
    /// Start an empty window at `now`.
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            started_at: now,
            counts: HashMap::new(),
        }
    }

    /// Time since the current window started.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Whether the current window has run its full period.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.period
    }

    /// Clear every count and restart the window if it has expired.
    ///
    /// Returns `true` when a reset happened.
    pub fn roll(&mut self, now: Instant) -> bool {
        if !self.is_expired(now) {
            return false;
        }
        self.counts.clear();
        self.started_at = now;
        true
    }

    /// Record one request for `identity` and return its new count.
    pub fn increment(&mut self, identity: &str) -> u64 {
        let count = self.counts.entry(identity.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Requests recorded for `identity` in the current window.
    pub fn count(&self, identity: &str) -> u64 {
        self.counts.get(identity).copied().unwrap_or(0)
    }

    /// Time left before the window resets.
    pub fn time_until_reset(&self, now: Instant) -> Duration {
        self.period.saturating_sub(self.elapsed(now))
    }

    /// Number of identities with a count in the current window.
    pub fn tracked(&self) -> usize {
        self.counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_increment_counts_per_identity() {
        let now = Instant::now();
        let mut window = FixedWindow::new(MINUTE, now);

        assert_eq!(window.increment("acme"), 1);
        assert_eq!(window.increment("acme"), 2);
        assert_eq!(window.increment("globex"), 1);

        assert_eq!(window.count("acme"), 2);
        assert_eq!(window.count("initech"), 0);
        assert_eq!(window.tracked(), 2);
    }

    #[test]
    fn test_roll_before_period_keeps_counts() {
        let start = Instant::now();
        let mut window = FixedWindow::new(MINUTE, start);
        window.increment("acme");

        assert!(!window.roll(start + Duration::from_secs(59)));
        assert_eq!(window.count("acme"), 1);
    }

    #[test]
    fn test_roll_at_period_clears_everything() {
        let start = Instant::now();
        let mut window = FixedWindow::new(MINUTE, start);
        window.increment("acme");
        window.increment("globex");

        let later = start + MINUTE;
        assert!(window.roll(later));
        assert_eq!(window.tracked(), 0);
        assert_eq!(window.elapsed(later), Duration::ZERO);
    }

    #[test]
    fn test_time_until_reset() {
        let start = Instant::now();
        let window = FixedWindow::new(MINUTE, start);

        assert_eq!(window.time_until_reset(start), MINUTE);
        assert_eq!(
            window.time_until_reset(start + Duration::from_secs(45)),
            Duration::from_secs(15)
        );
        assert_eq!(
            window.time_until_reset(start + Duration::from_secs(90)),
            Duration::ZERO
        );
    }
}
