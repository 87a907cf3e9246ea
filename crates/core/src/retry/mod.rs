//! Retry governor
//!
//! Two independent bounded ladders (flood control and transport) share one
//! client-scoped lock. Neither ladder ever blocks forever: reaching the
//! ceiling resets the counter and the governor declines.

mod governor;

pub use governor::{Ladder, RetryDecision, RetryGovernor, RetryState};
