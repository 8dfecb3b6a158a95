//! Endpoint handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::response::{failure, FieldError, ResponseModel};
use super::GatewayState;
use crate::rates::{CurrencyCode, RateError};

const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
}

/// Liveness probe; never authenticated or rate limited.
pub async fn health() -> (StatusCode, Json<HealthState>) {
    (StatusCode::OK, Json(HealthState::Healthy))
}

#[derive(Debug, Deserialize)]
pub struct RateQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RateModel {
    pub value: Decimal,
}

/// `GET /rates?from=X&to=Y`
#[instrument(skip(state))]
pub async fn get_rate(State(state): State<GatewayState>, Query(query): Query<RateQuery>) -> Response {
    let from = parse_supported(&state, "from", query.from.as_deref());
    let to = parse_supported(&state, "to", query.to.as_deref());

    let (from, to) = match (from, to) {
        (Ok(from), Ok(to)) => (from, to),
        (from, to) => {
            let errors = [from.err(), to.err()].into_iter().flatten().collect();
            return failure(StatusCode::BAD_REQUEST, errors);
        }
    };

    let cancel = state.shutdown.child_token();
    match state.rates.get_rate(&from, &to, &cancel).await {
        Ok(value) => Json(ResponseModel::success(RateModel { value })).into_response(),
        Err(RateError::UnsupportedCurrency(code)) => {
            let name = if code.eq_ignore_ascii_case(from.as_str()) {
                "from"
            } else {
                "to"
            };
            let message = RateError::UnsupportedCurrency(code).to_string();
            failure(StatusCode::BAD_REQUEST, vec![FieldError::new(name, message)])
        }
        Err(err) => upstream_failure(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    #[serde(rename = "currencyCode")]
    pub currency_code: Option<String>,
}

/// `GET /products?currencyCode=X`
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<GatewayState>,
    Query(query): Query<ProductsQuery>,
) -> Response {
    let requested = query
        .currency_code
        .as_deref()
        .filter(|code| !code.trim().is_empty())
        .unwrap_or(DEFAULT_CURRENCY);

    let target = match parse_supported(&state, "currencyCode", Some(requested)) {
        Ok(target) => target,
        Err(error) => return failure(StatusCode::BAD_REQUEST, vec![error]),
    };

    let cancel = state.shutdown.child_token();
    match state
        .catalog
        .price_in(&target, state.rates.as_ref(), &cancel)
        .await
    {
        Ok(priced) => {
            info!(target = %target, products = priced.len(), "Listed products");
            Json(ResponseModel::success(priced)).into_response()
        }
        Err(RateError::UnsupportedCurrency(code)) if code.eq_ignore_ascii_case(target.as_str()) => {
            let message = RateError::UnsupportedCurrency(code).to_string();
            failure(
                StatusCode::BAD_REQUEST,
                vec![FieldError::new("currencyCode", message)],
            )
        }
        Err(err) => upstream_failure(err),
    }
}

fn parse_code(name: &str, raw: Option<&str>) -> Result<CurrencyCode, FieldError> {
    raw.ok_or_else(|| FieldError::new(name, "Value is required."))?
        .parse()
        .map_err(|_| FieldError::new(name, "Must be a currency code."))
}

/// Parse and check the code against the currencies the gateway serves.
fn parse_supported(
    state: &GatewayState,
    name: &str,
    raw: Option<&str>,
) -> Result<CurrencyCode, FieldError> {
    let code = parse_code(name, raw)?;
    if state.supported.contains(&code) {
        Ok(code)
    } else {
        let message = RateError::UnsupportedCurrency(code.to_string()).to_string();
        Err(FieldError::new(name, message))
    }
}

fn upstream_failure(err: RateError) -> Response {
    let status = match err {
        RateError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    warn!(error = %err, status = status.as_u16(), "Rate lookup failed");
    failure(status, vec![FieldError::new("rate", err.to_string())])
}
