//! HTTP gateway: bearer auth -> rate limit -> handlers backed by the cached rate source.

mod handlers;
mod middleware;
mod response;
mod server;

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::auth::BearerAuthenticator;
use crate::catalog::Catalog;
use crate::rates::{CurrencyCode, RateSource};
use crate::ratelimit::RateLimiter;

pub use middleware::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET};
pub use response::{FieldError, Outcome, ResponseModel};
pub use server::GatewayServer;

/// Everything the handlers share. Cloned per request.
#[derive(Clone)]
pub struct GatewayState {
    /// Rate lookups, normally the caching decorator over the upstream
    pub rates: Arc<dyn RateSource>,
    /// `None` when rate limiting is disabled
    pub limiter: Option<Arc<RateLimiter>>,
    pub authenticator: Arc<BearerAuthenticator>,
    pub catalog: Arc<Catalog>,
    /// Codes accepted in `from`, `to` and `currencyCode`
    pub supported: Arc<BTreeSet<CurrencyCode>>,
    /// Cancelled on shutdown; each request works under a child token
    pub shutdown: CancellationToken,
}

/// Build the gateway's routes.
pub fn router(state: GatewayState) -> Router {
    let protected = Router::new()
        .route("/rates", get(handlers::get_rate))
        .route("/products", get(handlers::list_products))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .with_state(state)
}
