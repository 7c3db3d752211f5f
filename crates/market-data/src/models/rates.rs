use std::collections::HashMap;

use super::types::{Coin, CurrencyCode};

/// Rates of a single coin, keyed by quote currency.
pub type CoinRates = HashMap<CurrencyCode, f64>;

/// Rates for many coins, keyed by coin then quote currency.
///
/// This is the shape of an upstream answer and of the cache contents. A
/// provider may omit coins it does not know and currencies it cannot quote.
pub type RateTable = HashMap<Coin, CoinRates>;
