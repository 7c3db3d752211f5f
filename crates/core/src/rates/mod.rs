//! Rates module - cache, batched fetch with rate-limit retry, and the
//! service that combines them.

mod rates_cache;
mod rates_model;
mod rates_retry;
mod rates_service;
mod rates_traits;


pub use rates_cache::{CacheLookup, RateCache, DEFAULT_CACHE_TTL};
pub use rates_model::{
    RateServiceConfig, RatesByCoin, DEFAULT_CURRENCY, DEFAULT_REQUEST_TIMEOUT,
};
pub use rates_retry::{fetch_with_retry, RetryPolicy, DEFAULT_RATE_LIMIT_BACKOFF};
pub use rates_service::RateService;
pub use rates_traits::RateServiceTrait;
