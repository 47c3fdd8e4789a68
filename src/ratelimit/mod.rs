//! Rate limiting logic and state management.

mod limiter;
mod window;

pub use limiter::{Admission, Permit, Policy, RateLimiter, RateLimiterConfig};
pub use window::{RateLimitWindow, TimeWindow};
