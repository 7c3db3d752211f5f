use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use coinrate_core::rates::{
    RateServiceConfig, RetryPolicy, DEFAULT_CACHE_TTL, DEFAULT_CURRENCY,
    DEFAULT_RATE_LIMIT_BACKOFF, DEFAULT_REQUEST_TIMEOUT,
};
use coinrate_market_data::provider::coingecko::DEFAULT_BASE_URL;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SNAPSHOT_PATH: &str = "data/rates.json";
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_PERSIST_INTERVAL: Duration = Duration::from_secs(300);
/// Upper bound for every duration setting (ten years).
const MAX_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub snapshot_path: PathBuf,
    pub upstream_url: String,
    pub upstream_api_key: Option<String>,
    pub cors_allow: Vec<String>,
    pub cache_ttl: Duration,
    pub rate_limit_backoff: Duration,
    /// Deadline for a request-path resolve; `None` waits for as long as the
    /// upstream keeps rate limiting.
    pub request_timeout: Option<Duration>,
    pub refresh_interval: Duration,
    pub persist_interval: Duration,
    pub default_currency: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            upstream_url: DEFAULT_BASE_URL.to_string(),
            upstream_api_key: None,
            cors_allow: vec!["*".to_string()],
            cache_ttl: DEFAULT_CACHE_TTL,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            persist_interval: DEFAULT_PERSIST_INTERVAL,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = parse_or(
            "COINRATE_LISTEN_ADDR",
            DEFAULT_LISTEN_ADDR,
            defaults.listen_addr,
        );
        let snapshot_path = std::env::var("COINRATE_SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.snapshot_path);
        let upstream_url =
            std::env::var("COINRATE_UPSTREAM_URL").unwrap_or(defaults.upstream_url);
        let upstream_api_key = std::env::var("COINRATE_UPSTREAM_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let cors_allow = std::env::var("COINRATE_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout = match secs("COINRATE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT) {
            d if d.is_zero() => None,
            d => Some(d),
        };
        let default_currency = std::env::var("COINRATE_DEFAULT_CURRENCY")
            .ok()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or(defaults.default_currency);

        Self {
            listen_addr,
            snapshot_path,
            upstream_url,
            upstream_api_key,
            cors_allow,
            cache_ttl: secs("COINRATE_CACHE_TTL_SECS", defaults.cache_ttl),
            rate_limit_backoff: secs(
                "COINRATE_RATE_LIMIT_BACKOFF_SECS",
                defaults.rate_limit_backoff,
            ),
            request_timeout,
            refresh_interval: non_zero(
                "COINRATE_REFRESH_INTERVAL_SECS",
                secs("COINRATE_REFRESH_INTERVAL_SECS", defaults.refresh_interval),
                defaults.refresh_interval,
            ),
            persist_interval: non_zero(
                "COINRATE_PERSIST_INTERVAL_SECS",
                secs("COINRATE_PERSIST_INTERVAL_SECS", defaults.persist_interval),
                defaults.persist_interval,
            ),
            default_currency,
        }
    }

    /// Settings handed to the rate service.
    pub fn rate_service_config(&self) -> RateServiceConfig {
        RateServiceConfig {
            cache_ttl: self.cache_ttl,
            retry: RetryPolicy {
                backoff: self.rate_limit_backoff,
            },
            request_timeout: self.request_timeout,
            default_currency: self.default_currency.clone(),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default_raw: &str, default: T) -> T {
    let raw = std::env::var(key).unwrap_or_else(|_| default_raw.to_string());
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid {}='{}', using {}", key, raw, default_raw);
        default
    })
}

fn secs(key: &str, default: Duration) -> Duration {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > MAX_SECS => {
                tracing::warn!("{}={} is too large, capping at {}s", key, value, MAX_SECS);
                Duration::from_secs(MAX_SECS)
            }
            Ok(value) => Duration::from_secs(value),
            Err(_) => {
                tracing::warn!("Invalid {}='{}', using {:?}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

/// Timer periods must be positive; `tokio::time::interval` panics on zero.
fn non_zero(key: &str, value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        tracing::warn!("{} must be positive, using {:?}", key, default);
        default
    } else {
        value
    }
}
