//! Exchange rate source trait and error types.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::currency::CurrencyCode;

/// Errors produced while looking up an exchange rate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// One of the codes is not known to the source.
    #[error("The currency '{0}' is not supported.")]
    UnsupportedCurrency(String),

    /// The upstream could not produce a rate.
    #[error("Upstream rate source failed: {0}")]
    Upstream(String),

    /// The backing key-value store failed on read.
    #[error("Rate cache store failed: {0}")]
    Cache(String),

    /// The caller's cancellation token fired before a rate was produced.
    #[error("Rate lookup cancelled")]
    Cancelled,
}

/// Result type for rate lookups.
pub type RateResult<T> = Result<T, RateError>;

/// Anything that can answer "how many `to` is one `from` worth".
///
/// Implemented by the upstream table and by the caching decorator wrapping it,
/// so callers never know whether they hit the cache.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the rate from `from` to `to`.
    ///
    /// Implementations should stop early with [`RateError::Cancelled`] once
    /// `cancel` fires.
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        cancel: &CancellationToken,
    ) -> RateResult<Decimal>;
}

#[async_trait]
impl<S: RateSource + ?Sized> RateSource for std::sync::Arc<S> {
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        cancel: &CancellationToken,
    ) -> RateResult<Decimal> {
        (**self).get_rate(from, to, cancel).await
    }
}

/// Scriptable rate source for tests that counts how often it is asked.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct MockRateSource {
    rates: dashmap::DashMap<(CurrencyCode, CurrencyCode), Decimal>,
    failure: parking_lot::Mutex<Option<RateError>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// Create a source with no rates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `from -> to` with `rate` from now on.
    pub fn set_rate(&self, from: &str, to: &str, rate: Decimal) {
        let from = from.parse().expect("valid currency code");
        let to = to.parse().expect("valid currency code");
        self.rates.insert((from, to), rate);
    }

    /// Fail every lookup with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<RateError>) {
        *self.failure.lock() = error;
    }

    /// Number of lookups served so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateSource for MockRateSource {
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        cancel: &CancellationToken,
    ) -> RateResult<Decimal> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if cancel.is_cancelled() {
            return Err(RateError::Cancelled);
        }
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }

        self.rates
            .get(&(from.clone(), to.clone()))
            .map(|rate| *rate)
            .ok_or_else(|| RateError::UnsupportedCurrency(from.to_string()))
    }
}
