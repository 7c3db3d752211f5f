use std::collections::HashMap;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coinrate_core::errors::Error as CoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: String,
    /// Rates that did resolve when only part of a batch was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    coin_rates: Option<HashMap<String, f64>>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => match e.root() {
                CoreError::UnsupportedCoin(_)
                | CoreError::UnsupportedCurrency { .. }
                | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
                CoreError::MarketData(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let message = self.to_string();
        let coin_rates = match self {
            ApiError::Core(CoreError::PartialBatch { rates, .. }) => Some(rates),
            _ => None,
        };
        let body = Json(ErrorBody {
            status_code: status.as_u16(),
            message,
            coin_rates,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
