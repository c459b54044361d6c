//! Read-side representations of products.

use common::ProductId;
use domain::Product;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A product as returned by queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDto {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub sale_price: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cost: Decimal,
    pub stock: i32,
    pub price_locked: bool,
    /// Gross margin as a percentage of the sale price, two decimals.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub margin_percent: Decimal,
}

impl From<&Product> for ProductDto {
    fn from(product: &Product) -> Self {
        let sale_price = product.sale_price().amount();
        let cost = product.cost().amount();

        Self {
            id: product.id(),
            name: product.name().to_string(),
            sku: product.sku().as_str().to_string(),
            sale_price,
            cost,
            stock: product.stock(),
            price_locked: product.is_price_locked(),
            margin_percent: margin_percent(sale_price, cost),
        }
    }
}

/// `(sale - cost) / sale * 100` rounded half away from zero; zero when nothing is charged.
pub fn margin_percent(sale_price: Decimal, cost: Decimal) -> Decimal {
    if sale_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    ((sale_price - cost) / sale_price * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page_number: u32,
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    /// Number of pages needed for `total` items.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }
}

/// Answer to a SKU availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuAvailability {
    /// The SKU after normalization.
    pub sku: String,
    pub exists: bool,
}
