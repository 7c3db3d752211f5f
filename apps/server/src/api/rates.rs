use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use coinrate_core::rates::RatesByCoin;
use coinrate_market_data::normalize_id;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateQuery {
    coin: Option<String>,
    currency: Option<String>,
    #[serde(default)]
    skip_cache: bool,
}

#[derive(Deserialize)]
struct RatesQuery {
    /// Comma-separated coin ids.
    coins: Option<String>,
    currency: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RatesResponse {
    coin_rates: RatesByCoin,
    currency: String,
}

fn currency_or_default(state: &AppState, currency: Option<String>) -> String {
    currency
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.config.default_currency.clone())
}

async fn get_tracked_coins(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.rate_service.get_tracked_coins())
}

async fn set_tracked_coins(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Vec<String>>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(coins) = body?;
    if coins.is_empty() {
        return Err(ApiError::BadRequest("coins must be a non-empty array".into()));
    }
    state.rate_service.set_tracked_coins(coins).await?;
    Ok(MessageResponse::new("Tracked coins updated"))
}

async fn get_tracked_currencies(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.rate_service.get_tracked_currencies())
}

async fn set_tracked_currencies(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Vec<String>>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(currencies) = body?;
    if currencies.is_empty() {
        return Err(ApiError::BadRequest(
            "currencies must be a non-empty array".into(),
        ));
    }
    state.rate_service.set_tracked_currencies(currencies)?;
    Ok(MessageResponse::new("Tracked currencies updated"))
}

async fn get_rate(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RateQuery>, QueryRejection>,
) -> ApiResult<Json<f64>> {
    let Query(q) = query?;
    let coin = q
        .coin
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("coin is required".into()))?;
    let currency = currency_or_default(&state, q.currency);

    let rate = state
        .rate_service
        .get_rate(&coin, &currency, q.skip_cache)
        .await?;
    Ok(Json(rate))
}

async fn get_rates(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RatesQuery>, QueryRejection>,
) -> ApiResult<Json<RatesResponse>> {
    let Query(q) = query?;
    let coins: Vec<String> = q
        .coins
        .unwrap_or_default()
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if coins.is_empty() {
        return Err(ApiError::BadRequest("coins is required".into()));
    }
    let currency = currency_or_default(&state, q.currency);

    let coin_rates = state.rate_service.get_rates(&coins, &currency).await?;
    Ok(Json(RatesResponse {
        coin_rates,
        currency: normalize_id(&currency),
    }))
}

async fn refresh_rates(State(state): State<Arc<AppState>>) -> ApiResult<Json<MessageResponse>> {
    let count = state
        .rate_service
        .refresh_rates(state.config.request_timeout)
        .await?;
    Ok(MessageResponse::new(format!(
        "Fetched rates for {} coins",
        count
    )))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rates", get(get_rates))
        .route("/rates/rate", get(get_rate))
        .route("/rates/coins", get(get_tracked_coins).post(set_tracked_coins))
        .route(
            "/rates/currencies",
            get(get_tracked_currencies).post(set_tracked_currencies),
        )
        .route("/rates/refresh", post(refresh_rates))
        .route("/rates/fetch-rates", get(refresh_rates))
}
