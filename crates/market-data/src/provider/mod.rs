//! Upstream rate provider abstraction and implementations.
//!
//! This module contains:
//! - The `RateProvider` trait that every upstream source implements
//! - The CoinGecko implementation used in production
//!
//! Providers perform exactly one network round-trip per call and classify
//! failures; retrying, caching and validation of the answer belong to the
//! caller.

mod traits;

pub mod coingecko;

pub use traits::RateProvider;
