//! Coinrate Market Data Crate
//!
//! Upstream rate fetching for the coinrate service.
//!
//! # Overview
//!
//! - [`RateProvider`] - one network round-trip for a `coins x currencies` batch
//! - [`CoinGeckoProvider`] - the production provider (`/simple/price`)
//! - [`MarketDataError`] - failure taxonomy, with [`RetryClass`] telling the
//!   caller whether the same request may be retried after a backoff
//!
//! # Type Aliases
//!
//! - [`Coin`] - upstream coin id (e.g. "bitcoin")
//! - [`CurrencyCode`] - quote currency id (e.g. "usd")
//! - [`RateTable`] - coin -> currency -> rate

pub mod errors;
pub mod models;
pub mod provider;

pub use errors::{MarketDataError, RetryClass};
pub use models::{normalize_id, Coin, CoinRates, CurrencyCode, RateTable};
pub use provider::coingecko::CoinGeckoProvider;
pub use provider::RateProvider;
