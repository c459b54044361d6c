//! Product aggregate implementation.

use common::ProductId;

use crate::aggregate::{AggregateRoot, PendingEvents};
use crate::error::DomainError;
use crate::value_objects::{Money, Sku};

use super::{ProductEvent, ProductState};

/// Product aggregate root.
///
/// All mutations go through [`Product::apply_safely`]: the action edits a
/// draft copy of the state, the draft is validated, and only a valid draft
/// replaces the live state. A failed (or panicking) action leaves every field
/// exactly as it was and records no events.
#[derive(Debug, Clone)]
pub struct Product {
    id: ProductId,
    state: ProductState,
    events: PendingEvents<ProductEvent>,
}

/// Working copy handed to a guarded mutation.
///
/// Setters enforce their own field rules; events recorded here are only
/// enqueued on the product if the whole mutation commits.
#[derive(Debug)]
pub struct ProductDraft {
    id: ProductId,
    state: ProductState,
    staged: Vec<ProductEvent>,
}

impl ProductDraft {
    /// Current values in the draft.
    pub fn state(&self) -> &ProductState {
        &self.state
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyName);
        }
        self.state.name = trimmed.to_string();
        Ok(())
    }

    pub fn set_sku(&mut self, sku: Sku) {
        self.state.sku = sku;
    }

    pub fn set_prices(&mut self, sale_price: Money, cost: Money) -> Result<(), DomainError> {
        if sale_price < cost {
            return Err(DomainError::SalePriceBelowCost {
                sale_price: sale_price.amount(),
                cost: cost.amount(),
            });
        }
        self.state.sale_price = sale_price;
        self.state.cost = cost;
        Ok(())
    }

    pub fn set_stock(&mut self, stock: i32) -> Result<(), DomainError> {
        if stock < 0 {
            return Err(DomainError::NegativeStock);
        }
        self.state.stock = stock;
        Ok(())
    }

    pub fn set_price_locked(&mut self, locked: bool) {
        self.state.price_locked = locked;
    }

    /// Stages an event to be enqueued on commit.
    pub fn record(&mut self, event: ProductEvent) {
        self.staged.push(event);
    }

    pub fn record_created(&mut self) {
        self.record(ProductEvent::product_created(self.id));
    }

    pub fn record_changed(&mut self) {
        self.record(ProductEvent::product_changed(self.id));
    }
}

impl AggregateRoot for Product {
    type Event = ProductEvent;

    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn pending_events(&self) -> &[ProductEvent] {
        self.events.as_slice()
    }

    fn take_events(&mut self) -> Vec<ProductEvent> {
        self.events.take()
    }
}

impl Product {
    /// Creates a product and records `ProductCreated`.
    pub fn new(
        id: ProductId,
        name: &str,
        sku: Sku,
        sale_price: Money,
        cost: Money,
        stock: i32,
    ) -> Result<Self, DomainError> {
        if id.is_nil() {
            return Err(DomainError::EmptyId);
        }

        let mut product = Self {
            id,
            state: ProductState::blank(sku),
            events: PendingEvents::new(),
        };

        product.apply_safely(|p| {
            p.set_name(name)?;
            p.set_prices(sale_price, cost)?;
            p.set_stock(stock)?;
            p.record_created();
            Ok(())
        })?;

        Ok(product)
    }

    /// Rehydrates a stored product without recording events.
    pub fn restore(id: ProductId, state: ProductState) -> Result<Self, DomainError> {
        if id.is_nil() {
            return Err(DomainError::EmptyId);
        }
        state.validate()?;

        Ok(Self {
            id,
            state,
            events: PendingEvents::new(),
        })
    }

    /// Runs a mutation all-or-nothing.
    ///
    /// The action receives a draft of the current state. If the action fails
    /// or the resulting draft breaks an invariant, the error is returned
    /// unchanged and the product is left untouched.
    pub fn apply_safely<F>(&mut self, action: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut ProductDraft) -> Result<(), DomainError>,
    {
        let mut draft = ProductDraft {
            id: self.id,
            state: self.state.clone(),
            staged: Vec::new(),
        };

        action(&mut draft)?;
        draft.state.validate()?;

        self.state = draft.state;
        for event in draft.staged {
            self.events.record(event);
        }
        Ok(())
    }

    pub fn update_name(&mut self, name: &str) -> Result<(), DomainError> {
        self.apply_safely(|p| {
            p.set_name(name)?;
            p.record_changed();
            Ok(())
        })
    }

    /// Changes sale price and cost together. Rejected while the price is locked.
    pub fn update_price(&mut self, sale_price: Money, cost: Money) -> Result<(), DomainError> {
        self.apply_safely(|p| {
            if p.state().price_locked {
                return Err(DomainError::PriceLocked);
            }
            p.set_prices(sale_price, cost)?;
            p.record_changed();
            Ok(())
        })
    }

    /// Adds `delta` (possibly negative) to the stock.
    pub fn adjust_stock(&mut self, delta: i32) -> Result<(), DomainError> {
        self.apply_safely(|p| {
            let stock = p.state().stock;
            let new_stock = stock
                .checked_add(delta)
                .ok_or(DomainError::StockOverflow { stock, delta })?;
            if new_stock < 0 {
                return Err(DomainError::NegativeStock);
            }
            p.set_stock(new_stock)?;
            p.record_changed();
            Ok(())
        })
    }

    pub fn lock_price(&mut self) -> Result<(), DomainError> {
        self.apply_safely(|p| {
            p.set_price_locked(true);
            p.record_changed();
            Ok(())
        })
    }

    pub fn unlock_price(&mut self) -> Result<(), DomainError> {
        self.apply_safely(|p| {
            p.set_price_locked(false);
            p.record_changed();
            Ok(())
        })
    }
}

// Query methods
impl Product {
    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn sku(&self) -> &Sku {
        &self.state.sku
    }

    pub fn sale_price(&self) -> Money {
        self.state.sale_price
    }

    pub fn cost(&self) -> Money {
        self.state.cost
    }

    pub fn stock(&self) -> i32 {
        self.state.stock
    }

    pub fn is_price_locked(&self) -> bool {
        self.state.price_locked
    }

    /// All invariant-bearing fields.
    pub fn state(&self) -> &ProductState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use rust_decimal_macros::dec;

    use super::*;
    use crate::aggregate::DomainEvent;

    fn money(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount).unwrap()
    }

    fn widget() -> Product {
        Product::new(
            ProductId::new(),
            "  Widget  ",
            Sku::parse("WID-001").unwrap(),
            money(dec!(10)),
            money(dec!(6)),
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_new_product_records_one_created_event() {
        let product = widget();

        assert_eq!(product.name(), "Widget");
        assert_eq!(product.stock(), 5);
        assert_eq!(product.pending_events().len(), 1);
        assert_eq!(product.pending_events()[0].event_type(), "ProductCreated");
    }

    #[test]
    fn test_new_product_rejects_nil_id() {
        let result = Product::new(
            ProductId::nil(),
            "Widget",
            Sku::parse("WID-001").unwrap(),
            money(dec!(10)),
            money(dec!(6)),
            0,
        );
        assert_eq!(result.err(), Some(DomainError::EmptyId));
    }

    #[test]
    fn test_new_product_rejects_sale_price_below_cost() {
        let result = Product::new(
            ProductId::new(),
            "Widget",
            Sku::parse("WID-001").unwrap(),
            money(dec!(5)),
            money(dec!(6)),
            0,
        );
        assert!(matches!(
            result,
            Err(DomainError::SalePriceBelowCost { .. })
        ));
    }

    #[test]
    fn test_new_product_rejects_negative_stock_and_blank_name() {
        let sku = Sku::parse("WID-001").unwrap();
        let negative = Product::new(
            ProductId::new(),
            "Widget",
            sku.clone(),
            money(dec!(1)),
            money(dec!(1)),
            -1,
        );
        assert_eq!(negative.err(), Some(DomainError::NegativeStock));

        let blank = Product::new(ProductId::new(), " ", sku, money(dec!(1)), money(dec!(1)), 0);
        assert_eq!(blank.err(), Some(DomainError::EmptyName));
    }

    #[test]
    fn test_update_price_below_cost_leaves_state_untouched() {
        let mut product = widget();
        let before = product.state().clone();
        let events_before = product.pending_events().to_vec();

        let result = product.update_price(money(dec!(3)), money(dec!(4)));

        assert!(matches!(
            result,
            Err(DomainError::SalePriceBelowCost { .. })
        ));
        assert_eq!(product.state(), &before);
        assert_eq!(product.pending_events(), events_before.as_slice());
    }

    #[test]
    fn test_update_price_fails_when_locked() {
        let mut product = widget();
        product.lock_price().unwrap();
        let before = product.state().clone();

        let result = product.update_price(money(dec!(20)), money(dec!(6)));

        assert_eq!(result, Err(DomainError::PriceLocked));
        assert_eq!(product.state(), &before);
    }

    #[test]
    fn test_unlock_allows_price_update() {
        let mut product = widget();
        product.lock_price().unwrap();
        product.unlock_price().unwrap();

        product.update_price(money(dec!(20)), money(dec!(6))).unwrap();
        assert_eq!(product.sale_price(), money(dec!(20)));
    }

    #[test]
    fn test_adjust_stock_below_zero_fails() {
        let mut product = widget();
        product.take_events();

        assert_eq!(product.adjust_stock(-6), Err(DomainError::NegativeStock));
        assert_eq!(product.stock(), 5);
        assert!(product.pending_events().is_empty());
    }

    #[test]
    fn test_adjust_stock_applies_delta_and_records_change() {
        let mut product = widget();
        product.take_events();

        product.adjust_stock(-5).unwrap();

        assert_eq!(product.stock(), 0);
        assert_eq!(product.pending_events().len(), 1);
        assert_eq!(product.pending_events()[0].event_type(), "ProductChanged");
    }

    #[test]
    fn test_adjust_stock_overflow_is_rejected() {
        let mut product = widget();
        assert!(matches!(
            product.adjust_stock(i32::MAX),
            Err(DomainError::StockOverflow { .. })
        ));
        assert_eq!(product.stock(), 5);
    }

    #[test]
    fn test_changes_coalesce_into_one_pending_event() {
        let mut product = widget();
        product.update_name("Gadget").unwrap();
        product.adjust_stock(1).unwrap();
        product.lock_price().unwrap();

        let kinds: Vec<_> = product
            .pending_events()
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(kinds, vec!["ProductCreated", "ProductChanged"]);
    }

    #[test]
    fn test_failed_action_rolls_back_partial_edits() {
        let mut product = widget();
        let before = product.state().clone();

        let result = product.apply_safely(|p| {
            p.set_name("Renamed")?;
            p.set_stock(99)?;
            p.record_changed();
            Err(DomainError::PriceLocked)
        });

        assert_eq!(result, Err(DomainError::PriceLocked));
        assert_eq!(product.state(), &before);
        assert_eq!(product.pending_events().len(), 1);
    }

    #[test]
    fn test_invalid_draft_is_not_committed() {
        let mut product = widget();
        let before = product.state().clone();

        let result = product.apply_safely(|p| {
            p.state.stock = -10;
            Ok(())
        });

        assert_eq!(result, Err(DomainError::NegativeStock));
        assert_eq!(product.state(), &before);
    }

    #[test]
    fn test_panicking_action_leaves_product_untouched() {
        let mut product = widget();
        let before = product.state().clone();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            product.apply_safely(|p| {
                p.set_name("Halfway").unwrap();
                panic!("boom");
            })
        }));

        assert!(outcome.is_err());
        assert_eq!(product.state(), &before);
    }

    #[test]
    fn test_take_events_drains_exactly_once() {
        let mut product = widget();
        assert_eq!(product.take_events().len(), 1);
        assert!(product.take_events().is_empty());
    }

    #[test]
    fn test_restore_validates_without_events() {
        let product = widget();
        let restored = Product::restore(product.id(), product.state().clone()).unwrap();

        assert!(restored.pending_events().is_empty());
        assert_eq!(restored.state(), product.state());

        let mut broken = product.state().clone();
        broken.stock = -1;
        assert_eq!(
            Product::restore(product.id(), broken).err(),
            Some(DomainError::NegativeStock)
        );
    }
}
