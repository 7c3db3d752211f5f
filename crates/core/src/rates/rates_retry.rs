//! Rate-limit aware fetching.
//!
//! The upstream signals throttling with HTTP 429. The same batch is retried
//! after a fixed backoff for as long as the caller's deadline allows; any
//! other failure is returned immediately.

use std::time::Duration;

use coinrate_market_data::{CurrencyCode, RateProvider, RateTable};
use log::{error, warn};
use tokio::time::Instant;

use crate::errors::{Error, Result};

/// Default sleep between rate-limited attempts.
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Sleep between attempts after a rate-limit response.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_RATE_LIMIT_BACKOFF,
        }
    }
}

/// Fetch `coins x currencies`, retrying on rate limits until `deadline`.
///
/// With no deadline the loop only ends on success or a non-throttling error.
/// Reaching the deadline, whether mid-request or mid-backoff, yields
/// [`Error::DeadlineExceeded`].
pub async fn fetch_with_retry(
    provider: &dyn RateProvider,
    coins: &[String],
    currencies: &[CurrencyCode],
    policy: &RetryPolicy,
    deadline: Option<Instant>,
) -> Result<RateTable> {
    let attempts = async {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match provider.fetch_rates(coins, currencies).await {
                Ok(table) => return Ok(table),
                Err(e) if e.is_rate_limited() => {
                    warn!(
                        "Rate limit hit for {} (attempt {}), retrying in {:?}",
                        provider.id(),
                        attempt,
                        policy.backoff
                    );
                    tokio::time::sleep(policy.backoff).await;
                }
                Err(e) => {
                    error!("Error fetching rates from {}: {}", provider.id(), e);
                    return Err(Error::from(e));
                }
            }
        }
    };

    match deadline {
        Some(deadline) => {
            let budget = deadline.saturating_duration_since(Instant::now());
            tokio::time::timeout_at(deadline, attempts)
                .await
                .map_err(|_| {
                    warn!("Gave up waiting on {} after {:?}", provider.id(), budget);
                    Error::DeadlineExceeded(budget)
                })?
        }
        None => attempts.await,
    }
}
