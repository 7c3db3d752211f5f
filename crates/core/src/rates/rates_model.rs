use std::collections::HashMap;
use std::time::Duration;

use coinrate_market_data::Coin;

use super::rates_cache::DEFAULT_CACHE_TTL;
use super::rates_retry::RetryPolicy;

/// Rates of several coins in one currency, as returned to callers.
pub type RatesByCoin = HashMap<Coin, f64>;

/// Currency assumed when a caller does not name one.
pub const DEFAULT_CURRENCY: &str = "usd";

/// Default deadline for a request-path resolve.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables of the [`RateService`](super::RateService).
#[derive(Clone, Debug)]
pub struct RateServiceConfig {
    /// How long a merge keeps the whole cache fresh.
    pub cache_ttl: Duration,
    /// Backoff applied when the upstream rate-limits us.
    pub retry: RetryPolicy,
    /// Deadline for request-path resolves; `None` waits on the upstream forever.
    pub request_timeout: Option<Duration>,
    /// Currency used to validate coins when no currency is tracked yet.
    pub default_currency: String,
}

impl Default for RateServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            retry: RetryPolicy::default(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}
