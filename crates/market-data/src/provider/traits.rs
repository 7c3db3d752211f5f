//! Rate provider trait definition.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{Coin, CurrencyCode, RateTable};

/// Trait for upstream rate providers.
///
/// # Contract
///
/// - One call is one upstream request for the full `coins x currencies` batch.
/// - Throttling must be reported as [`MarketDataError::RateLimited`] so the
///   caller can back off and retry; any other failure uses the remaining
///   variants.
/// - Coins the upstream does not recognise are simply absent from the
///   returned table, and a recognised coin may lack some of the requested
///   currencies. Neither is an error at this level.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Unique identifier for this provider, used in logs and errors.
    fn id(&self) -> &'static str;

    /// Fetch the latest rates for every coin against every currency.
    async fn fetch_rates(
        &self,
        coins: &[Coin],
        currencies: &[CurrencyCode],
    ) -> Result<RateTable, MarketDataError>;
}
