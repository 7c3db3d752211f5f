//! Rate models
//!
//! - `types` - Identifier aliases (Coin, CurrencyCode) and their normalization
//! - `rates` - Rate tables as returned by providers and stored by the cache

mod rates;
mod types;

pub use rates::{CoinRates, RateTable};
pub use types::{normalize_id, Coin, CurrencyCode};
