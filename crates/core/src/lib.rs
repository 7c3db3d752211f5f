//! Coinrate Core - rate caching and batched-fetch aggregation.
//!
//! Given a set of requested coins in one currency, the [`rates::RateService`]
//! answers what it can from a TTL cache, fetches only the misses from the
//! upstream in one batched call (absorbing rate limits with a fixed backoff
//! bounded by a deadline), merges the answer back into the cache and records
//! the coins in the tracked set that drives background refreshes.

pub mod errors;
pub mod rates;
pub mod storage;
pub mod tracked;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
