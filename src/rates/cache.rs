//! Cache-aside decorator over any [`RateSource`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::currency::{CanonicalPair, CurrencyCode};
use super::source::{RateError, RateResult, RateSource};
use super::store::{KeyValueStore, StoreError};

/// Default lifetime of a cached rate.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Wraps a rate source with pair-normalized, time-expiring caching.
///
/// Each unordered pair `{A, B}` is cached once, under `"<low>:<high>"`, holding
/// the `low -> high` rate. Requests for `high -> low` are answered with the
/// reciprocal.
///
/// Concurrent misses on the same key are not coalesced: each one fetches from
/// the inner source and writes back, and the last write wins.
pub struct CachingRateSource<S> {
    inner: S,
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl<S: RateSource> CachingRateSource<S> {
    /// Wrap `inner`, caching into `store` for [`DEFAULT_TTL`].
    pub fn new(inner: S, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(inner, store, DEFAULT_TTL)
    }

    /// Wrap `inner`, caching into `store` for `ttl`.
    pub fn with_ttl(inner: S, store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { inner, store, ttl }
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Read the canonical rate for `pair` and orient it for the caller.
    ///
    /// `Ok(None)` covers both a miss and an unusable cached value.
    async fn read_cached(
        &self,
        pair: &CanonicalPair,
        key: &str,
        cancel: &CancellationToken,
    ) -> RateResult<Option<Decimal>> {
        let raw = match self.store.get_string(key, cancel).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(StoreError::Cancelled) => return Err(RateError::Cancelled),
            Err(StoreError::Backend(cause)) => return Err(RateError::Cache(cause)),
        };

        let rate = raw
            .parse::<Decimal>()
            .ok()
            .filter(|rate| rate.is_sign_positive() && !rate.is_zero())
            .and_then(|rate| pair.orient(rate));

        if rate.is_none() {
            warn!(key = key, value = %raw, "Discarding malformed cached rate");
        }
        Ok(rate)
    }
}

#[async_trait]
impl<S: RateSource> RateSource for CachingRateSource<S> {
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        cancel: &CancellationToken,
    ) -> RateResult<Decimal> {
        let pair = CanonicalPair::new(from, to);
        let key = pair.cache_key();

        if let Some(rate) = self.read_cached(&pair, &key, cancel).await? {
            debug!(key = %key, pair = %pair, "Rate cache hit");
            return Ok(rate);
        }

        debug!(key = %key, pair = %pair, "Rate cache miss");
        let canonical = self.inner.get_rate(&pair.low, &pair.high, cancel).await?;

        // Runs on its own task so dropping the caller's future detaches the write.
        let handle = tokio::spawn(write_back(
            self.store.clone(),
            key.clone(),
            canonical.to_string(),
            self.ttl,
        ));
        if let Err(err) = handle.await {
            warn!(key = %key, error = %err, "Cache write-back task failed");
        }

        pair.orient(canonical)
            .ok_or_else(|| RateError::Upstream(format!("zero rate returned for {key}")))
    }
}

async fn write_back(store: Arc<dyn KeyValueStore>, key: String, value: String, ttl: Duration) {
    if let Err(err) = store.set_string(&key, value, ttl).await {
        warn!(key = %key, error = %err, "Failed to write rate to cache");
    }
}
