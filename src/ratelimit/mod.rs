//! Per-identity fixed-window rate limiting.

mod limiter;
mod window;

pub use limiter::{
    RateLimitDecision, RateLimitPolicy, RateLimitStatus, RateLimiter, DEFAULT_MAX_REQUESTS,
    DEFAULT_PERIOD,
};
pub use window::FixedWindow;
