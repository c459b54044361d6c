//! Mutable product fields.

use crate::error::DomainError;
use crate::value_objects::{Money, Sku};

/// Every product field that participates in an invariant.
///
/// This is the snapshot the mutation guard drafts against, and the shape
/// repositories use to rehydrate a stored product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductState {
    pub name: String,
    pub sku: Sku,
    pub sale_price: Money,
    pub cost: Money,
    pub stock: i32,
    pub price_locked: bool,
}

impl ProductState {
    pub(crate) fn blank(sku: Sku) -> Self {
        Self {
            name: String::new(),
            sku,
            sale_price: Money::zero(),
            cost: Money::zero(),
            stock: 0,
            price_locked: false,
        }
    }

    /// Checks the global invariants.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::EmptyName);
        }

        if self.sku.as_str().is_empty() {
            return Err(DomainError::EmptySku);
        }

        if self.sale_price < self.cost {
            return Err(DomainError::SalePriceBelowCost {
                sale_price: self.sale_price.amount(),
                cost: self.cost.amount(),
            });
        }

        if self.stock < 0 {
            return Err(DomainError::NegativeStock);
        }

        Ok(())
    }
}
