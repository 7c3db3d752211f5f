use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use coinrate_market_data::{Coin, CurrencyCode, MarketDataError, RateProvider, RateTable};
use coinrate_server::{api::app_router, build_state_with_provider, config::Config};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Ok,
    RateLimited,
    Failing,
}

struct MockProvider {
    mode: Mode,
    calls: Mutex<usize>,
}

impl MockProvider {
    fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RateProvider for MockProvider {
    fn id(&self) -> &'static str {
        "MOCK"
    }

    async fn fetch_rates(
        &self,
        coins: &[Coin],
        currencies: &[CurrencyCode],
    ) -> Result<RateTable, MarketDataError> {
        *self.calls.lock().unwrap() += 1;
        match self.mode {
            Mode::RateLimited => {
                return Err(MarketDataError::RateLimited {
                    provider: "MOCK".into(),
                })
            }
            Mode::Failing => {
                return Err(MarketDataError::ProviderError {
                    provider: "MOCK".into(),
                    message: "HTTP 503".into(),
                })
            }
            Mode::Ok => {}
        }

        let known: HashMap<&str, HashMap<&str, f64>> = HashMap::from([
            ("bitcoin", HashMap::from([("usd", 50000.0), ("eur", 46000.0)])),
            ("ethereum", HashMap::from([("usd", 3000.0), ("eur", 2800.0)])),
        ]);
        Ok(coins
            .iter()
            .filter_map(|coin| {
                let rates = known.get(coin.as_str())?;
                Some((
                    coin.clone(),
                    currencies
                        .iter()
                        .filter_map(|c| rates.get(c.as_str()).map(|r| (c.clone(), *r)))
                        .collect(),
                ))
            })
            .collect())
    }
}

struct TestApp {
    router: Router,
    _dir: TempDir,
}

async fn build_app_with(provider: Arc<MockProvider>, tweak: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempdir().unwrap();
    let mut config = Config {
        snapshot_path: dir.path().join("rates.json"),
        ..Config::default()
    };
    tweak(&mut config);

    let state = build_state_with_provider(&config, provider).await.unwrap();
    TestApp {
        router: app_router(state, &config),
        _dir: dir,
    }
}

async fn build_app(provider: Arc<MockProvider>) -> TestApp {
    build_app_with(provider, |_| {}).await
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

#[tokio::test]
async fn health_reports_ok() {
    let app = build_app(MockProvider::new(Mode::Ok)).await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn single_rate_is_cached_between_requests() {
    let provider = MockProvider::new(Mode::Ok);
    let app = build_app(provider.clone()).await;

    let (status, body) = get(&app, "/rates/rate?coin=bitcoin&currency=usd").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(50000.0));

    let (_, body) = get(&app, "/rates/rate?coin=bitcoin&currency=usd").await;
    assert_eq!(body, json!(50000.0));
    assert_eq!(provider.calls(), 1);

    let (_, body) = get(&app, "/rates/rate?coin=bitcoin&currency=usd&skipCache=true").await;
    assert_eq!(body, json!(50000.0));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn rate_defaults_to_configured_currency() {
    let app = build_app_with(MockProvider::new(Mode::Ok), |c| {
        c.default_currency = "eur".into()
    })
    .await;

    let (status, body) = get(&app, "/rates/rate?coin=bitcoin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(46000.0));
}

#[tokio::test]
async fn bulk_rates_return_coin_map() {
    let app = build_app(MockProvider::new(Mode::Ok)).await;

    let (status, body) = get(&app, "/rates?coins=bitcoin,%20Ethereum&currency=EUR").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "coinRates": { "bitcoin": 46000.0, "ethereum": 2800.0 },
            "currency": "eur"
        })
    );

    let (_, tracked) = get(&app, "/rates/coins").await;
    assert_eq!(tracked, json!(["bitcoin", "ethereum"]));
    let (_, currencies) = get(&app, "/rates/currencies").await;
    assert_eq!(currencies, json!(["eur"]));
}

#[tokio::test]
async fn unsupported_coin_is_a_client_error() {
    let app = build_app(MockProvider::new(Mode::Ok)).await;

    let (status, body) = get(&app, "/rates?coins=bitcoin,fakecoin&currency=usd").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    assert!(body["message"].as_str().unwrap().contains("fakecoin"));
    assert_eq!(body["coinRates"], json!({ "bitcoin": 50000.0 }));

    // The supported coin from the same batch is still served and tracked.
    let (status, body) = get(&app, "/rates/rate?coin=bitcoin&currency=usd").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(50000.0));
    let (_, tracked) = get(&app, "/rates/coins").await;
    assert_eq!(tracked, json!(["bitcoin"]));
}

#[tokio::test]
async fn unsupported_currency_is_a_client_error() {
    let app = build_app(MockProvider::new(Mode::Ok)).await;
    let (status, body) = get(&app, "/rates/rate?coin=bitcoin&currency=xyz").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("xyz"));
    assert!(body.get("coinRates").is_none());
}

#[tokio::test]
async fn missing_coin_parameters_are_rejected() {
    let provider = MockProvider::new(Mode::Ok);
    let app = build_app(provider.clone()).await;

    let (status, _) = get(&app, "/rates/rate?currency=usd").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/rates?coins=,,&currency=usd").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/rates").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let app = build_app(MockProvider::new(Mode::Failing)).await;
    let (status, body) = get(&app, "/rates/rate?coin=bitcoin&currency=usd").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["statusCode"], 502);
}

#[tokio::test(start_paused = true)]
async fn endless_rate_limit_is_gateway_timeout() {
    let app = build_app_with(MockProvider::new(Mode::RateLimited), |c| {
        c.request_timeout = Some(Duration::from_secs(25));
    })
    .await;

    let (status, body) = get(&app, "/rates/rate?coin=bitcoin&currency=usd").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["statusCode"], 504);
}

#[tokio::test]
async fn tracked_coins_can_be_replaced() {
    let app = build_app(MockProvider::new(Mode::Ok)).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/rates/coins",
        Some(json!(["Bitcoin", "ethereum"])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    let (_, tracked) = get(&app, "/rates/coins").await;
    assert_eq!(tracked, json!(["bitcoin", "ethereum"]));

    let (status, _) = send(
        &app,
        Method::POST,
        "/rates/coins",
        Some(json!(["bitcoin", "fakecoin"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, tracked) = get(&app, "/rates/coins").await;
    assert_eq!(tracked, json!(["bitcoin", "ethereum"]));

    let (status, _) = send(&app, Method::POST, "/rates/coins", Some(json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::POST, "/rates/coins", Some(json!({"coins": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tracked_currencies_can_be_replaced() {
    let app = build_app(MockProvider::new(Mode::Ok)).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/rates/currencies",
        Some(json!(["USD", "eur"])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, currencies) = get(&app, "/rates/currencies").await;
    assert_eq!(currencies, json!(["usd", "eur"]));

    let (status, _) = send(&app, Method::POST, "/rates/currencies", Some(json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn manual_refresh_warms_tracked_rates() {
    let provider = MockProvider::new(Mode::Ok);
    let app = build_app(provider.clone()).await;

    send(
        &app,
        Method::POST,
        "/rates/currencies",
        Some(json!(["usd", "eur"])),
    )
    .await;
    send(&app, Method::POST, "/rates/coins", Some(json!(["bitcoin"]))).await;
    let calls_before = provider.calls();

    let (status, body) = send(&app, Method::POST, "/rates/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Fetched rates for 1 coins");
    assert_eq!(provider.calls(), calls_before + 1);

    let (status, _) = get(&app, "/rates/fetch-rates").await;
    assert_eq!(status, StatusCode::OK);

    // Both currencies are now cached.
    let calls_before = provider.calls();
    get(&app, "/rates/rate?coin=bitcoin&currency=eur").await;
    assert_eq!(provider.calls(), calls_before);
}

#[tokio::test]
async fn startup_restores_snapshot_and_warms_cache() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rates.json");
    std::fs::write(
        &path,
        json!({
            "timeStamp": 1700000000000i64,
            "trackedCoins": ["bitcoin"],
            "trackedCurrencies": ["usd"]
        })
        .to_string(),
    )
    .unwrap();

    let provider = MockProvider::new(Mode::Ok);
    let config = Config {
        snapshot_path: path,
        ..Config::default()
    };
    let state = build_state_with_provider(&config, provider.clone())
        .await
        .unwrap();
    assert_eq!(provider.calls(), 1);
    assert_eq!(state.rate_service.get_tracked_coins(), vec!["bitcoin"]);

    let app = TestApp {
        router: app_router(state, &config),
        _dir: dir,
    };
    let (status, body) = get(&app, "/rates/rate?coin=bitcoin&currency=usd").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(50000.0));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn startup_survives_failing_upstream() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rates.json");
    std::fs::write(
        &path,
        json!({
            "timeStamp": 1,
            "trackedCoins": ["bitcoin"],
            "trackedCurrencies": ["usd"]
        })
        .to_string(),
    )
    .unwrap();

    let config = Config {
        snapshot_path: path,
        ..Config::default()
    };
    let state = build_state_with_provider(&config, MockProvider::new(Mode::Failing)).await;
    assert!(state.is_ok());
}
