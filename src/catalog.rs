//! Static product catalog priced in a caller-chosen currency.

use std::collections::{BTreeSet, HashMap};

use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::rates::{CurrencyCode, RateResult, RateSource};

/// A product with its list price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub currency_code: CurrencyCode,
    pub price: Decimal,
}

impl Product {
    fn new(name: &str, currency: &str, price: Decimal) -> Option<Self> {
        Some(Self {
            name: name.to_string(),
            currency_code: currency.parse().ok()?,
            price,
        })
    }
}

/// A product together with its price in the requested currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedProduct {
    pub product: Product,
    pub converted_price: Decimal,
}

/// The storefront's product list.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Create a catalog from an explicit product list.
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// All products in list order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Price every product in `target`.
    ///
    /// One rate is fetched per distinct product currency, concurrently. The
    /// first failing lookup fails the whole listing.
    pub async fn price_in(
        &self,
        target: &CurrencyCode,
        rates: &dyn RateSource,
        cancel: &CancellationToken,
    ) -> RateResult<Vec<PricedProduct>> {
        let currencies: BTreeSet<&CurrencyCode> =
            self.products.iter().map(|p| &p.currency_code).collect();

        let lookups = currencies.into_iter().map(|from| async move {
            let rate = rates.get_rate(from, target, cancel).await?;
            RateResult::Ok((from.clone(), rate))
        });
        let rates: HashMap<CurrencyCode, Decimal> = try_join_all(lookups).await?.into_iter().collect();

        debug!(target = %target, currencies = rates.len(), "Priced catalog");

        Ok(self
            .products
            .iter()
            .filter_map(|product| {
                rates.get(&product.currency_code).map(|rate| PricedProduct {
                    product: product.clone(),
                    converted_price: product.price * *rate,
                })
            })
            .collect())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let products = [
            ("Maple Syrup, 250ml", "CAD", Decimal::new(999, 2)),
            ("American Cheese, 454g", "USD", Decimal::new(695, 2)),
            ("Marmite, 454g", "GBP", Decimal::new(499, 2)),
            ("Camembert Cheese, 150g", "EUR", Decimal::new(2153, 2)),
            ("Prosciutto, 50g", "EUR", Decimal::new(729, 2)),
            ("Avocado, 3-pack", "MXN", Decimal::new(6947, 2)),
        ]
        .into_iter()
        .filter_map(|(name, currency, price)| Product::new(name, currency, price))
        .collect();

        Self::new(products)
    }
}
