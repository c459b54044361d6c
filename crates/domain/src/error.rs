//! Domain error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Business rules rejected a value or a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Entity identifiers must not be the nil UUID.
    #[error("Id must not be empty")]
    EmptyId,

    /// Product names must contain at least one non-whitespace character.
    #[error("Name cannot be empty")]
    EmptyName,

    /// SKU input was blank.
    #[error("SKU cannot be empty")]
    EmptySku,

    /// SKU did not normalize to 3-32 uppercase alphanumerics.
    #[error("SKU has invalid format: {normalized:?}. Use 3-32 alphanumeric characters")]
    InvalidSkuFormat { normalized: String },

    /// Money amounts are never negative.
    #[error("Money amount cannot be negative: {amount}")]
    NegativeMoney { amount: Decimal },

    /// Subtraction would go below zero.
    #[error("Money operation would result in negative amount")]
    NegativeMoneyResult,

    /// Sale price must cover cost.
    #[error("SalePrice ({sale_price}) must be greater than or equal to Cost ({cost})")]
    SalePriceBelowCost { sale_price: Decimal, cost: Decimal },

    /// Stock must stay at or above zero.
    #[error("Stock cannot be negative")]
    NegativeStock,

    /// Stock arithmetic left the representable range.
    #[error("Stock adjustment of {delta} overflows the current stock {stock}")]
    StockOverflow { stock: i32, delta: i32 },

    /// Price changes are rejected while the price is locked.
    #[error("Price is locked and cannot be modified")]
    PriceLocked,

    /// Another product already uses this normalized SKU.
    #[error("SKU already exists: {sku}")]
    DuplicateSku { sku: String },
}
