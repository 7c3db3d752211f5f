use std::collections::{HashMap, HashSet};
use std::time::Duration;

use coinrate_market_data::{Coin, CoinRates, RateTable};
use tokio::time::Instant;

use super::rates_model::RatesByCoin;

/// Default time-to-live of cached rates.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Stand-in expiry for a TTL too large to add to an instant (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Result of a bulk cache lookup.
///
/// Every requested coin lands in exactly one of `hits` or `misses`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheLookup {
    pub hits: RatesByCoin,
    /// Coins to fetch, in request order, without duplicates.
    pub misses: Vec<Coin>,
}

/// In-memory rates with a single expiry shared by every entry.
///
/// Once `now > expiry` the whole cache reads as empty. Stale entries are not
/// purged; a later merge only adds or overwrites the currencies it carries
/// and pushes the shared expiry forward for all coins.
#[derive(Debug)]
pub struct RateCache {
    entries: RateTable,
    expiry: Option<Instant>,
    ttl: Duration,
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl RateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            expiry: None,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn expiry(&self) -> Option<Instant> {
        self.expiry
    }

    pub fn is_fresh_at(&self, now: Instant) -> bool {
        matches!(self.expiry, Some(expiry) if now <= expiry)
    }

    pub fn lookup(&self, coin: &str, currency: &str) -> Option<f64> {
        self.lookup_at(coin, currency, Instant::now())
    }

    pub fn lookup_at(&self, coin: &str, currency: &str, now: Instant) -> Option<f64> {
        if !self.is_fresh_at(now) {
            return None;
        }
        self.entries.get(coin)?.get(currency).copied()
    }

    pub fn lookup_many(&self, coins: &[Coin], currency: &str) -> CacheLookup {
        self.lookup_many_at(coins, currency, Instant::now())
    }

    pub fn lookup_many_at(&self, coins: &[Coin], currency: &str, now: Instant) -> CacheLookup {
        let mut lookup = CacheLookup::default();
        let mut seen = HashSet::with_capacity(coins.len());

        for coin in coins {
            if !seen.insert(coin.as_str()) {
                continue;
            }
            match self.lookup_at(coin, currency, now) {
                Some(rate) => {
                    lookup.hits.insert(coin.clone(), rate);
                }
                None => lookup.misses.push(coin.clone()),
            }
        }
        lookup
    }

    pub fn merge(&mut self, fresh: RateTable) {
        self.merge_at(fresh, Instant::now());
    }

    /// Deep-merge `fresh` into the cache and restart the shared TTL at `now`.
    pub fn merge_at(&mut self, fresh: RateTable, now: Instant) {
        for (coin, rates) in fresh {
            self.entries.entry(coin).or_default().extend(rates);
        }
        self.expiry = Some(
            now.checked_add(self.ttl)
                .or_else(|| now.checked_add(FAR_FUTURE))
                .unwrap_or(now),
        );
    }

    /// Stored rates for a coin regardless of freshness.
    pub fn raw_entry(&self, coin: &str) -> Option<&CoinRates> {
        self.entries.get(coin)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
