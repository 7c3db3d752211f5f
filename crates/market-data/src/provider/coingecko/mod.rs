//! CoinGecko provider for crypto conversion rates.
//!
//! Uses the public `/simple/price` endpoint, which answers a whole
//! `ids x vs_currencies` batch in one request:
//!
//! ```text
//! GET {base}/simple/price?ids=bitcoin,ethereum&vs_currencies=usd,eur
//! {"bitcoin":{"usd":50000,"eur":46000},"ethereum":{"usd":3000,"eur":2760}}
//! ```
//!
//! Unknown ids are silently left out of the answer. The free tier throttles
//! aggressively and signals it with HTTP 429.

mod models;

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};

use crate::errors::MarketDataError;
use crate::models::{Coin, CurrencyCode, RateTable};
use crate::provider::RateProvider;

use self::models::SimplePriceResponse;

/// Provider ID constant
const PROVIDER_ID: &str = "COINGECKO";

/// Public API root
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Header carrying a demo-tier API key
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// CoinGecko rate provider.
///
/// # Example
///
/// ```ignore
/// use coinrate_market_data::provider::coingecko::CoinGeckoProvider;
///
/// let provider = CoinGeckoProvider::new(None, None);
/// let rates = provider.fetch_rates(&["bitcoin".into()], &["usd".into()]).await?;
/// ```
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoProvider {
    /// Create a provider against `base_url` (defaults to the public API).
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        let base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            client,
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Build the `/simple/price` URL for a batch.
    fn price_url(
        &self,
        coins: &[Coin],
        currencies: &[CurrencyCode],
    ) -> Result<reqwest::Url, MarketDataError> {
        let ids = coins.join(",");
        let vs_currencies = currencies.join(",");
        reqwest::Url::parse_with_params(
            &format!("{}/simple/price", self.base_url),
            &[("ids", ids.as_str()), ("vs_currencies", vs_currencies.as_str())],
        )
        .map_err(|e| MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to build URL: {}", e),
        })
    }
}

#[async_trait]
impl RateProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_rates(
        &self,
        coins: &[Coin],
        currencies: &[CurrencyCode],
    ) -> Result<RateTable, MarketDataError> {
        if coins.is_empty() || currencies.is_empty() {
            return Ok(RateTable::new());
        }

        let url = self.price_url(coins, currencies)?;
        debug!("CoinGecko request: {}", url);

        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::Network(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let body: SimplePriceResponse =
            response
                .json()
                .await
                .map_err(|e| MarketDataError::InvalidResponse {
                    provider: PROVIDER_ID.to_string(),
                    message: e.to_string(),
                })?;

        Ok(body.into_rate_table())
    }
}
