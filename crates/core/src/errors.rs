//! Core error types for the coinrate service.
//!
//! Upstream failures arrive as [`MarketDataError`] and are wrapped here; a
//! rate-limited upstream never shows up because the retry loop absorbs it.

use std::collections::HashMap;
use std::time::Duration;

use coinrate_market_data::MarketDataError;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the rate service.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport, status or parse failure talking to the upstream.
    #[error("Upstream request failed: {0}")]
    MarketData(#[from] MarketDataError),

    /// The upstream does not know this coin.
    #[error("Coin '{0}' is not supported")]
    UnsupportedCoin(String),

    /// The upstream knows the coin but cannot quote it in this currency.
    #[error("Currency '{currency}' is not supported for coin '{coin}'")]
    UnsupportedCurrency { coin: String, currency: String },

    /// The caller's deadline elapsed while waiting on the upstream.
    #[error("Timed out after {0:?} waiting for upstream rates")]
    DeadlineExceeded(Duration),

    /// Part of a batch was rejected. `rates` holds every coin that did
    /// resolve; those are cached and tracked like a normal answer.
    #[error("{source}")]
    PartialBatch {
        rates: HashMap<String, f64>,
        source: Box<Error>,
    },

    #[error("Input validation failed: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for rejections the caller can fix by asking for something else.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self.root(),
            Self::UnsupportedCoin(_) | Self::UnsupportedCurrency { .. }
        )
    }

    /// The underlying rejection, unwrapping a partial batch.
    pub fn root(&self) -> &Error {
        match self {
            Self::PartialBatch { source, .. } => source.root(),
            other => other,
        }
    }

    /// Rates that resolved before the request was rejected.
    pub fn partial_rates(&self) -> Option<&HashMap<String, f64>> {
        match self {
            Self::PartialBatch { rates, .. } => Some(rates),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_classification() {
        assert!(Error::UnsupportedCoin("fakecoin".into()).is_unsupported());
        assert!(Error::UnsupportedCurrency {
            coin: "bitcoin".into(),
            currency: "xyz".into()
        }
        .is_unsupported());
        assert!(!Error::DeadlineExceeded(Duration::from_secs(1)).is_unsupported());
    }

    #[test]
    fn test_partial_batch_wraps_rejection() {
        let error = Error::PartialBatch {
            rates: HashMap::from([("bitcoin".to_string(), 50000.0)]),
            source: Box::new(Error::UnsupportedCoin("fakecoin".into())),
        };

        assert!(error.is_unsupported());
        assert!(matches!(error.root(), Error::UnsupportedCoin(c) if c == "fakecoin"));
        assert_eq!(error.partial_rates().unwrap()["bitcoin"], 50000.0);
        assert_eq!(error.to_string(), "Coin 'fakecoin' is not supported");
        assert!(Error::UnsupportedCoin("x".into()).partial_rates().is_none());
    }

    #[test]
    fn test_error_display() {
        let error = Error::UnsupportedCurrency {
            coin: "bitcoin".into(),
            currency: "xyz".into(),
        };
        assert_eq!(
            error.to_string(),
            "Currency 'xyz' is not supported for coin 'bitcoin'"
        );

        let error = Error::MarketData(MarketDataError::ProviderError {
            provider: "COINGECKO".into(),
            message: "HTTP 500".into(),
        });
        assert_eq!(
            error.to_string(),
            "Upstream request failed: Provider error: COINGECKO - HTTP 500"
        );
    }
}
