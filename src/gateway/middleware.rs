//! Request pipeline stages run before every protected handler.

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::GatewayState;
use crate::auth::{Identity, REALM};
use crate::ratelimit::RateLimitStatus;

pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Resolve the bearer token to an [`Identity`] and attach it to the request.
///
/// Anonymous or badly authenticated requests get a `401` challenge.
pub async fn authenticate(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.authenticator.authenticate(header) {
        Ok(Some(identity)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Ok(None) => {
            debug!("Rejecting request without credentials");
            challenge()
        }
        Err(err) => {
            debug!(reason = %err, "Rejecting request with invalid credentials");
            challenge()
        }
    }
}

fn challenge() -> Response {
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer realm=\"{REALM}\"")) {
        response.headers_mut().insert(WWW_AUTHENTICATE, value);
    }
    response
}

/// Count the request against its tenant and reject it once over the limit.
///
/// Metered responses carry the limit headers whether or not they were allowed.
pub async fn rate_limit(State(state): State<GatewayState>, request: Request, next: Next) -> Response {
    let Some(limiter) = state.limiter.as_ref() else {
        return next.run(request).await;
    };

    let decision = limiter.check_and_record(
        request
            .extensions()
            .get::<Identity>()
            .map(|identity| identity.tenant.as_str()),
    );

    let Some(status) = decision.status().copied() else {
        return next.run(request).await;
    };

    let mut response = if status.allowed {
        next.run(request).await
    } else {
        StatusCode::TOO_MANY_REQUESTS.into_response()
    };

    attach_headers(&mut response, &status);
    response
}

fn attach_headers(response: &mut Response, status: &RateLimitStatus) {
    let headers = response.headers_mut();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(status.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(status.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(status.reset_after.as_secs()));
}
