use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use coinrate_market_data::{normalize_id, Coin, CoinRates, CurrencyCode, RateProvider, RateTable};
use log::{debug, info, warn};
use tokio::time::Instant;

use super::rates_cache::{CacheLookup, RateCache};
use super::rates_model::{RateServiceConfig, RatesByCoin};
use super::rates_retry::fetch_with_retry;
use super::rates_traits::RateServiceTrait;
use crate::errors::{Error, Result};
use crate::tracked::{TrackedSet, TrackedSetStore};

/// Answers rate requests from cache where possible and batches the rest into
/// a single upstream call.
///
/// The cache sits behind one lock so a merge (entries plus the shared expiry)
/// is observed atomically. No lock is held across an upstream call, so
/// concurrent misses for the same coin each fetch independently.
pub struct RateService {
    provider: Arc<dyn RateProvider>,
    cache: RwLock<RateCache>,
    tracked: Arc<TrackedSetStore>,
    config: RateServiceConfig,
}

impl RateService {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        tracked: Arc<TrackedSetStore>,
        config: RateServiceConfig,
    ) -> Self {
        Self {
            provider,
            cache: RwLock::new(RateCache::new(config.cache_ttl)),
            tracked,
            config,
        }
    }

    pub fn config(&self) -> &RateServiceConfig {
        &self.config
    }

    pub fn tracked(&self) -> &Arc<TrackedSetStore> {
        &self.tracked
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, RateCache> {
        self.cache.read().unwrap_or_else(|poisoned| {
            warn!("Rate cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, RateCache> {
        self.cache.write().unwrap_or_else(|poisoned| {
            warn!("Rate cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Cached rate of a coin, if the cache is fresh.
    pub fn cached_rate(&self, coin: &str, currency: &str) -> Option<f64> {
        self.read_cache().lookup(&normalize_id(coin), &normalize_id(currency))
    }

    /// A timeout too large to represent as an instant means no deadline.
    fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
        timeout.and_then(|t| Instant::now().checked_add(t))
    }

    /// Resolve several coins in one currency under the configured request timeout.
    pub async fn resolve_many(&self, coins: &[String], currency: &str) -> Result<RatesByCoin> {
        let deadline = Self::deadline_after(self.config.request_timeout);
        self.resolve_many_with_deadline(coins, currency, deadline).await
    }

    /// Resolve several coins in one currency, giving up at `deadline`.
    pub async fn resolve_many_with_deadline(
        &self,
        coins: &[String],
        currency: &str,
        deadline: Option<Instant>,
    ) -> Result<RatesByCoin> {
        self.resolve(coins, currency, false, deadline).await
    }

    /// Resolve a single coin; the same path as [`resolve_many`](Self::resolve_many).
    pub async fn resolve_one(&self, coin: &str, currency: &str, skip_cache: bool) -> Result<f64> {
        let coin = normalize_id(coin);
        let deadline = Self::deadline_after(self.config.request_timeout);
        let rates = self
            .resolve(std::slice::from_ref(&coin), currency, skip_cache, deadline)
            .await?;
        rates
            .get(&coin)
            .copied()
            .ok_or_else(|| Error::UnsupportedCoin(coin))
    }

    async fn resolve(
        &self,
        coins: &[String],
        currency: &str,
        skip_cache: bool,
        deadline: Option<Instant>,
    ) -> Result<RatesByCoin> {
        let currency = normalize_required(currency, "currency")?;
        let coins = normalize_coins(coins)?;

        let CacheLookup { mut hits, misses } = if skip_cache {
            CacheLookup {
                misses: coins,
                ..CacheLookup::default()
            }
        } else {
            let cache = self.read_cache();
            cache.lookup_many(&coins, &currency)
        };

        if misses.is_empty() {
            debug!("All {} rates in {} served from cache", hits.len(), currency);
            return Ok(hits);
        }
        debug!(
            "{} cache hits, fetching {} missing rates in {}",
            hits.len(),
            misses.len(),
            currency
        );

        let fetched = fetch_with_retry(
            self.provider.as_ref(),
            &misses,
            std::slice::from_ref(&currency),
            &self.config.retry,
            deadline,
        )
        .await?;

        let outcome = validate_batch(&misses, &currency, &fetched);

        if !outcome.validated.is_empty() {
            let fresh: RateTable = outcome
                .validated
                .iter()
                .map(|(coin, rate)| (coin.clone(), CoinRates::from([(currency.clone(), *rate)])))
                .collect();
            self.write_cache().merge(fresh);
            self.tracked.add_all(
                misses
                    .iter()
                    .filter(|coin| outcome.validated.contains_key(*coin)),
                &currency,
            );
            info!(
                "Got {} rates in {} via {}",
                outcome.validated.len(),
                currency,
                self.provider.id()
            );
        }

        let rejection = outcome.rejection(&currency);
        hits.extend(outcome.validated);

        match rejection {
            None => Ok(hits),
            Some(error) => {
                warn!("Rejecting rate request: {}", error);
                if hits.is_empty() {
                    Err(error)
                } else {
                    Err(Error::PartialBatch {
                        rates: hits,
                        source: Box::new(error),
                    })
                }
            }
        }
    }

    /// Warm the cache with every tracked coin in every tracked currency.
    ///
    /// The answer is merged as-is; coins the upstream leaves out are not
    /// reported.
    pub async fn refresh_tracked_rates(&self, deadline: Option<Instant>) -> Result<usize> {
        let tracked = self.tracked.snapshot();
        if tracked.coins().is_empty() || tracked.currencies().is_empty() {
            warn!("No tracked coins or currencies to fetch rates for");
            return Ok(0);
        }

        let fetched = fetch_with_retry(
            self.provider.as_ref(),
            tracked.coins(),
            tracked.currencies(),
            &self.config.retry,
            deadline,
        )
        .await?;

        let received = fetched.len();
        self.write_cache().merge(fetched);
        info!(
            "Fetched rates for {} of {} tracked coins",
            received,
            tracked.coins().len()
        );
        Ok(received)
    }

    /// Replace the tracked coins, after one batched upstream check.
    ///
    /// Nothing is committed if any coin is unknown upstream.
    pub async fn replace_tracked_coins(&self, coins: &[String]) -> Result<()> {
        let coins = normalize_coins(coins)?;
        let currency = self
            .tracked
            .currencies()
            .into_iter()
            .next()
            .unwrap_or_else(|| normalize_id(&self.config.default_currency));

        let deadline = Self::deadline_after(self.config.request_timeout);
        let fetched = fetch_with_retry(
            self.provider.as_ref(),
            &coins,
            std::slice::from_ref(&currency),
            &self.config.retry,
            deadline,
        )
        .await?;

        if let Some(unknown) = coins.iter().find(|coin| !fetched.contains_key(*coin)) {
            warn!("Refusing to track unsupported coin '{}'", unknown);
            return Err(Error::UnsupportedCoin(unknown.clone()));
        }

        self.write_cache().merge(fetched);
        self.tracked.set_coins(&coins);
        Ok(())
    }

    pub fn replace_tracked_currencies(&self, currencies: &[String]) -> Result<()> {
        let mut normalized = Vec::with_capacity(currencies.len());
        for currency in currencies {
            normalized.push(normalize_required(currency, "currency")?);
        }
        if normalized.is_empty() {
            return Err(Error::Validation("currencies must not be empty".into()));
        }
        self.tracked.set_currencies(&normalized);
        Ok(())
    }
}

#[async_trait]
impl RateServiceTrait for RateService {
    fn get_tracked_coins(&self) -> Vec<Coin> {
        self.tracked.coins()
    }

    fn get_tracked_currencies(&self) -> Vec<CurrencyCode> {
        self.tracked.currencies()
    }

    async fn set_tracked_coins(&self, coins: Vec<String>) -> Result<()> {
        self.replace_tracked_coins(&coins).await
    }

    fn set_tracked_currencies(&self, currencies: Vec<String>) -> Result<()> {
        self.replace_tracked_currencies(&currencies)
    }

    async fn get_rate(&self, coin: &str, currency: &str, skip_cache: bool) -> Result<f64> {
        self.resolve_one(coin, currency, skip_cache).await
    }

    async fn get_rates(&self, coins: &[String], currency: &str) -> Result<RatesByCoin> {
        self.resolve_many(coins, currency).await
    }

    async fn refresh_rates(&self, timeout: Option<Duration>) -> Result<usize> {
        self.refresh_tracked_rates(Self::deadline_after(timeout)).await
    }

    async fn restore_tracked(&self) -> TrackedSet {
        self.tracked.restore().await
    }

    async fn persist_tracked(&self) {
        self.tracked.persist().await;
    }
}

/// Per-coin verdict on an upstream answer for a batch of misses.
#[derive(Debug, Default)]
struct BatchOutcome {
    validated: RatesByCoin,
    unknown_coins: Vec<Coin>,
    missing_currency: Vec<Coin>,
}

impl BatchOutcome {
    /// First rejection, unknown coins before missing currencies.
    fn rejection(&self, currency: &str) -> Option<Error> {
        if let Some(coin) = self.unknown_coins.first() {
            return Some(Error::UnsupportedCoin(coin.clone()));
        }
        self.missing_currency
            .first()
            .map(|coin| Error::UnsupportedCurrency {
                coin: coin.clone(),
                currency: currency.to_string(),
            })
    }
}

fn validate_batch(requested: &[Coin], currency: &str, fetched: &RateTable) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for coin in requested {
        match fetched.get(coin) {
            None => outcome.unknown_coins.push(coin.clone()),
            Some(rates) => match rates.get(currency) {
                Some(rate) => {
                    outcome.validated.insert(coin.clone(), *rate);
                }
                None => outcome.missing_currency.push(coin.clone()),
            },
        }
    }
    outcome
}

fn normalize_required(raw: &str, what: &str) -> Result<String> {
    let id = normalize_id(raw);
    if id.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", what)));
    }
    Ok(id)
}

/// Normalize, reject blanks, and drop duplicates keeping first occurrence.
fn normalize_coins(coins: &[String]) -> Result<Vec<Coin>> {
    if coins.is_empty() {
        return Err(Error::Validation("at least one coin is required".into()));
    }
    let mut seen = HashSet::with_capacity(coins.len());
    let mut normalized = Vec::with_capacity(coins.len());
    for coin in coins {
        let id = normalize_required(coin, "coin")?;
        if seen.insert(id.clone()) {
            normalized.push(id);
        }
    }
    Ok(normalized)
}
