use std::time::Duration;

use async_trait::async_trait;
use coinrate_market_data::{Coin, CurrencyCode};

use super::rates_model::RatesByCoin;
use crate::errors::Result;
use crate::tracked::TrackedSet;

/// Trait defining the contract for rate service operations.
#[async_trait]
pub trait RateServiceTrait: Send + Sync {
    fn get_tracked_coins(&self) -> Vec<Coin>;

    fn get_tracked_currencies(&self) -> Vec<CurrencyCode>;

    /// Replace the tracked coins after checking every one upstream.
    async fn set_tracked_coins(&self, coins: Vec<String>) -> Result<()>;

    /// Replace the tracked currencies.
    fn set_tracked_currencies(&self, currencies: Vec<String>) -> Result<()>;

    /// Rate of one coin; `skip_cache` forces an upstream round-trip.
    async fn get_rate(&self, coin: &str, currency: &str, skip_cache: bool) -> Result<f64>;

    async fn get_rates(&self, coins: &[String], currency: &str) -> Result<RatesByCoin>;

    /// Re-fetch every tracked coin in every tracked currency and merge the
    /// answer into the cache. Returns the number of coins received.
    async fn refresh_rates(&self, timeout: Option<Duration>) -> Result<usize>;

    async fn restore_tracked(&self) -> TrackedSet;

    async fn persist_tracked(&self);
}
