use std::sync::Arc;

use crate::config::Config;
use coinrate_core::{
    rates::{RateService, RateServiceTrait},
    storage::JsonFileStore,
    tracked::TrackedSetStore,
};
use coinrate_market_data::{CoinGeckoProvider, RateProvider};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub rate_service: Arc<dyn RateServiceTrait>,
    pub config: Config,
}

pub fn init_tracing() {
    let log_format = std::env::var("COINRATE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    tracing::info!("Upstream rate provider: {}", config.upstream_url);
    let provider = Arc::new(CoinGeckoProvider::new(
        Some(config.upstream_url.clone()),
        config.upstream_api_key.clone(),
    ));
    build_state_with_provider(config, provider).await
}

/// Wire the services around `provider`, restore the tracked set and warm the
/// cache once.
pub async fn build_state_with_provider(
    config: &Config,
    provider: Arc<dyn RateProvider>,
) -> anyhow::Result<Arc<AppState>> {
    let tracked = Arc::new(TrackedSetStore::new(
        Arc::new(JsonFileStore::new()),
        config.snapshot_path.clone(),
    ));
    let rate_service = Arc::new(RateService::new(
        provider,
        tracked,
        config.rate_service_config(),
    ));

    rate_service.restore_tracked().await;
    match rate_service
        .refresh_rates(Some(config.refresh_interval))
        .await
    {
        Ok(count) => tracing::info!("Startup refresh cached rates for {} coins", count),
        Err(e) => tracing::warn!("Startup refresh failed: {}", e),
    }

    Ok(Arc::new(AppState {
        rate_service,
        config: config.clone(),
    }))
}
