//! Currency codes and canonical pair ordering.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::source::RateError;

/// A currency code such as `USD`.
///
/// Codes are trimmed and upper-cased on construction, so `"eur"` and `"EUR"`
/// are the same code. Ordering is plain byte order on the normalized text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// The normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = RateError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let code = raw.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RateError::UnsupportedCurrency(raw.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = RateError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A currency pair in canonical `(low, high)` order.
///
/// One cached entry answers both directions of a pair: the entry always holds
/// "1 `low` = rate `high`", and a request made in the other direction is
/// answered with the reciprocal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalPair {
    /// The smaller code under byte order
    pub low: CurrencyCode,
    /// The larger (or equal) code under byte order
    pub high: CurrencyCode,
    /// Whether the caller asked for `high -> low`
    pub inverted: bool,
}

impl CanonicalPair {
    /// Order a requested `from -> to` pair.
    pub fn new(from: &CurrencyCode, to: &CurrencyCode) -> Self {
        if from > to {
            Self {
                low: to.clone(),
                high: from.clone(),
                inverted: true,
            }
        } else {
            Self {
                low: from.clone(),
                high: to.clone(),
                inverted: false,
            }
        }
    }

    /// The shared cache key, `"<low>:<high>"`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.low, self.high)
    }

    /// Turn a canonical `low -> high` rate into the rate the caller asked for.
    ///
    /// Returns `None` when the rate must be inverted and is zero.
    pub fn orient(&self, canonical_rate: Decimal) -> Option<Decimal> {
        if self.inverted {
            Decimal::ONE.checked_div(canonical_rate)
        } else {
            Some(canonical_rate)
        }
    }
}

impl fmt::Display for CanonicalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            write!(f, "{}->{}", self.high, self.low)
        } else {
            write!(f, "{}->{}", self.low, self.high)
        }
    }
}
