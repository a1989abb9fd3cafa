//! Shared utilities: wall-clock helpers, NTP timestamp mapping, and
//! diagnostic rate limiting

pub mod ntp;
pub mod rate_limiter;
pub mod time;

pub use rate_limiter::RateLimiter;
