//! CoinGecko `/simple/price` response handling.

use std::collections::HashMap;

use log::debug;
use serde::Deserialize;

use crate::models::{CoinRates, RateTable};

/// Raw `/simple/price` body: `{ "<coin>": { "<currency>": <number|null>, ... }, ... }`.
///
/// Values are kept as raw JSON so a single `null` or unexpected entry does not
/// fail the whole batch.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub(super) struct SimplePriceResponse(pub HashMap<String, HashMap<String, serde_json::Value>>);

impl SimplePriceResponse {
    /// Convert into a rate table, keeping only finite, non-negative numbers.
    pub(super) fn into_rate_table(self) -> RateTable {
        self.0
            .into_iter()
            .map(|(coin, quotes)| {
                let rates: CoinRates = quotes
                    .into_iter()
                    .filter_map(|(currency, value)| match value.as_f64() {
                        Some(rate) if rate.is_finite() && rate >= 0.0 => {
                            Some((currency.to_lowercase(), rate))
                        }
                        _ => {
                            debug!("Skipping non-numeric rate {}/{}: {}", coin, currency, value);
                            None
                        }
                    })
                    .collect();
                (coin.to_lowercase(), rates)
            })
            .collect()
    }
}
