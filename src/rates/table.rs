//! In-memory upstream rate table with simulated latency.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::currency::CurrencyCode;
use super::source::{RateError, RateResult, RateSource};

/// USD value of one unit of each default currency.
pub fn default_usd_rates() -> HashMap<CurrencyCode, Decimal> {
    [
        ("USD", Decimal::new(100, 2)),
        ("CAD", Decimal::new(71, 2)),
        ("EUR", Decimal::new(110, 2)),
        ("GBP", Decimal::new(120, 2)),
        ("MXN", Decimal::new(42, 3)),
    ]
    .into_iter()
    .filter_map(|(code, rate)| code.parse().ok().map(|code| (code, rate)))
    .collect()
}

/// Rate source that derives every cross rate from a USD-pivot table.
///
/// Stands in for the remote pricing API: each lookup waits `latency` first,
/// and that wait can be cut short by the caller's cancellation token.
pub struct RateTable {
    usd_rates: HashMap<CurrencyCode, Decimal>,
    latency: Duration,
}

impl RateTable {
    /// Create a table answering immediately.
    pub fn new(usd_rates: HashMap<CurrencyCode, Decimal>) -> Self {
        Self::with_latency(usd_rates, Duration::ZERO)
    }

    /// Create a table that waits `latency` before every answer.
    pub fn with_latency(usd_rates: HashMap<CurrencyCode, Decimal>, latency: Duration) -> Self {
        Self { usd_rates, latency }
    }

    /// Sorted list of supported codes.
    pub fn supported(&self) -> Vec<&CurrencyCode> {
        let mut codes: Vec<_> = self.usd_rates.keys().collect();
        codes.sort();
        codes
    }

    fn usd_value(&self, code: &CurrencyCode) -> RateResult<Decimal> {
        self.usd_rates
            .get(code)
            .copied()
            .ok_or_else(|| RateError::UnsupportedCurrency(code.to_string()))
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new(default_usd_rates())
    }
}

#[async_trait]
impl RateSource for RateTable {
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        cancel: &CancellationToken,
    ) -> RateResult<Decimal> {
        if !self.latency.is_zero() {
            trace!(latency_ms = self.latency.as_millis() as u64, "Simulating upstream latency");
            tokio::select! {
                _ = cancel.cancelled() => return Err(RateError::Cancelled),
                _ = tokio::time::sleep(self.latency) => {}
            }
        } else if cancel.is_cancelled() {
            return Err(RateError::Cancelled);
        }

        let from_usd = self.usd_value(from)?;
        let to_usd = self.usd_value(to)?;

        let rate = from_usd
            .checked_div(to_usd)
            .ok_or_else(|| RateError::Upstream(format!("no usable USD rate for {to}")))?;

        debug!(from = %from, to = %to, rate = %rate, "Upstream rate computed");
        Ok(rate)
    }
}
