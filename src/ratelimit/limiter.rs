//! Core fixed-window rate limiter.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::window::FixedWindow;
use crate::clock::{Clock, SystemClock};

/// Default maximum requests per identity per window.
pub const DEFAULT_MAX_REQUESTS: u64 = 15;
/// Default window length.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Deployment-wide limit applied to every identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum requests allowed in one window
    pub max_requests: u64,
    /// Length of the window
    pub period: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            period: DEFAULT_PERIOD,
        }
    }
}

/// Outcome of one metered request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Whether the request may proceed
    pub allowed: bool,
    /// The configured maximum
    pub limit: u64,
    /// The identity's count including this request
    pub count: u64,
    /// Requests left in this window, never negative
    pub remaining: u64,
    /// Time until the window resets
    pub reset_after: Duration,
}

impl RateLimitStatus {
    /// Time until reset in fractional seconds.
    pub fn reset_seconds(&self) -> f64 {
        self.reset_after.as_secs_f64()
    }
}

/// Result of [`RateLimiter::check_and_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The caller has no identity; nothing was counted.
    Unidentified,
    /// The request was counted against an identity.
    Metered(RateLimitStatus),
}

impl RateLimitDecision {
    /// Whether the request may proceed.
    pub fn is_allowed(&self) -> bool {
        match self {
            RateLimitDecision::Unidentified => true,
            RateLimitDecision::Metered(status) => status.allowed,
        }
    }

    /// The metering details, if the request was counted.
    pub fn status(&self) -> Option<&RateLimitStatus> {
        match self {
            RateLimitDecision::Unidentified => None,
            RateLimitDecision::Metered(status) => Some(status),
        }
    }
}

/// Per-identity fixed-window rate limiter.
///
/// One instance is shared by every request handler. Each check runs the
/// reset, increment and report steps inside a single critical section.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    window: Mutex<FixedWindow>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter on the system clock.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Create a limiter reading time from `clock`.
    pub fn with_clock(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        let window = FixedWindow::new(policy.period, clock.now());
        Self {
            policy,
            window: Mutex::new(window),
            clock,
        }
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Count a request for `identity` and decide whether it may proceed.
    ///
    /// Requests without an identity are always allowed and never counted.
    pub fn check_and_record(&self, identity: Option<&str>) -> RateLimitDecision {
        let Some(identity) = identity else {
            trace!("Skipping rate limit for unidentified caller");
            return RateLimitDecision::Unidentified;
        };

        let (count, reset_after) = {
            let mut window = self.window.lock();
            let now = self.clock.now();

            if window.roll(now) {
                debug!(period_secs = self.policy.period.as_secs(), "Rate limit window reset");
            }

            let count = window.increment(identity);
            (count, window.time_until_reset(now))
        };

        let allowed = count <= self.policy.max_requests;
        let status = RateLimitStatus {
            allowed,
            limit: self.policy.max_requests,
            count,
            remaining: self.policy.max_requests.saturating_sub(count),
            reset_after,
        };

        if allowed {
            trace!(identity = identity, count = count, "Request within rate limit");
        } else {
            debug!(
                identity = identity,
                count = count,
                limit = self.policy.max_requests,
                "Rate limit exceeded"
            );
        }

        RateLimitDecision::Metered(status)
    }

    /// Requests counted for `identity` in the current window.
    pub fn current_count(&self, identity: &str) -> u64 {
        let window = self.window.lock();
        if window.is_expired(self.clock.now()) {
            return 0;
        }
        window.count(identity)
    }

    /// Number of identities counted in the current window.
    pub fn tracked_identities(&self) -> usize {
        let window = self.window.lock();
        if window.is_expired(self.clock.now()) {
            return 0;
        }
        window.tracked()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}
