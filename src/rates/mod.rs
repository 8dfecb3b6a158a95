//! Exchange rate lookup: sources, the cache-aside decorator and its store.

mod cache;
mod currency;
mod source;
mod store;
mod table;

pub use cache::{CachingRateSource, DEFAULT_TTL};
pub use currency::{CanonicalPair, CurrencyCode};
pub use source::{RateError, RateResult, RateSource};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use table::{default_usd_rates, RateTable};

#[cfg(any(test, feature = "test-utils"))]
pub use source::MockRateSource;
