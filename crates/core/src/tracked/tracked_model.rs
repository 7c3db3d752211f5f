use std::collections::HashSet;

use coinrate_market_data::{normalize_id, Coin, CurrencyCode};
use serde::{Deserialize, Serialize};

/// Coins and currencies of interest.
///
/// Both lists keep first-insertion order and never hold duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedSet {
    coins: Vec<Coin>,
    currencies: Vec<CurrencyCode>,
}

impl TrackedSet {
    /// Build a set from raw identifiers, normalizing and deduplicating them.
    pub fn new<C, K>(coins: C, currencies: K) -> Self
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let mut set = Self::default();
        set.set_coins(coins);
        set.set_currencies(currencies);
        set
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn currencies(&self) -> &[CurrencyCode] {
        &self.currencies
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty() && self.currencies.is_empty()
    }

    /// Insert a coin. Returns `true` if it was not tracked yet.
    pub fn add_coin(&mut self, coin: &str) -> bool {
        insert_unique(&mut self.coins, coin)
    }

    /// Insert a currency. Returns `true` if it was not tracked yet.
    pub fn add_currency(&mut self, currency: &str) -> bool {
        insert_unique(&mut self.currencies, currency)
    }

    /// Replace all tracked coins.
    pub fn set_coins<I>(&mut self, coins: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.coins.clear();
        for coin in coins {
            insert_unique(&mut self.coins, coin.as_ref());
        }
    }

    /// Replace all tracked currencies.
    pub fn set_currencies<I>(&mut self, currencies: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.currencies.clear();
        for currency in currencies {
            insert_unique(&mut self.currencies, currency.as_ref());
        }
    }

    /// Membership equality, ignoring order.
    pub fn same_members(&self, other: &TrackedSet) -> bool {
        let as_set = |items: &[String]| items.iter().cloned().collect::<HashSet<_>>();
        as_set(&self.coins) == as_set(&other.coins)
            && as_set(&self.currencies) == as_set(&other.currencies)
    }
}

fn insert_unique(items: &mut Vec<String>, raw: &str) -> bool {
    let id = normalize_id(raw);
    if id.is_empty() || items.contains(&id) {
        return false;
    }
    items.push(id);
    true
}

/// On-disk snapshot of a [`TrackedSet`].
///
/// ```json
/// { "timeStamp": 1700000000000, "trackedCoins": ["bitcoin"], "trackedCurrencies": ["usd"] }
/// ```
///
/// Both lists are required; a document missing either is treated as malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedSnapshot {
    /// Epoch milliseconds at which the snapshot was written.
    #[serde(default)]
    pub time_stamp: i64,
    pub tracked_coins: Vec<Coin>,
    pub tracked_currencies: Vec<CurrencyCode>,
}

impl TrackedSnapshot {
    pub fn from_set(set: &TrackedSet, time_stamp: i64) -> Self {
        Self {
            time_stamp,
            tracked_coins: set.coins.clone(),
            tracked_currencies: set.currencies.clone(),
        }
    }

    pub fn into_set(self) -> TrackedSet {
        TrackedSet::new(self.tracked_coins, self.tracked_currencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_normalizes_and_deduplicates() {
        let set = TrackedSet::new(["Bitcoin", "bitcoin ", "ethereum", ""], ["USD", "usd"]);
        assert_eq!(set.coins(), &["bitcoin", "ethereum"]);
        assert_eq!(set.currencies(), &["usd"]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut set = TrackedSet::default();
        assert!(set.add_coin("bitcoin"));
        assert!(!set.add_coin("BITCOIN"));
        assert!(set.add_currency("eur"));
        assert!(!set.add_currency("eur"));
        assert_eq!(set.coins().len(), 1);
        assert_eq!(set.currencies().len(), 1);
    }

    #[test]
    fn test_same_members_ignores_order() {
        let a = TrackedSet::new(["a", "b"], ["usd"]);
        let b = TrackedSet::new(["b", "a"], ["usd"]);
        let c = TrackedSet::new(["a"], ["usd"]);
        assert!(a.same_members(&b));
        assert!(!a.same_members(&c));
    }

    #[test]
    fn test_snapshot_wire_format() {
        let set = TrackedSet::new(["bitcoin"], ["usd"]);
        let value = serde_json::to_value(TrackedSnapshot::from_set(&set, 42)).unwrap();
        assert_eq!(
            value,
            json!({ "timeStamp": 42, "trackedCoins": ["bitcoin"], "trackedCurrencies": ["usd"] })
        );
    }

    #[test]
    fn test_snapshot_missing_field_is_rejected() {
        let value = json!({ "timeStamp": 1, "trackedCoins": ["bitcoin"] });
        assert!(serde_json::from_value::<TrackedSnapshot>(value).is_err());
    }
}
