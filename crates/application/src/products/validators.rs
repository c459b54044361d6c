//! Field rules for product requests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use store::{SortDirection, SortField};

use super::commands::{CreateProduct, DeleteProduct, SetPriceLock, UpdateProduct};
use super::queries::{GetProductById, ListProducts, SkuExists};
use crate::error::ValidationErrors;
use crate::pipeline::Validator;

pub const NAME_MAX_LEN: usize = 200;

fn check_name(errors: &mut ValidationErrors, name: &str) {
    if name.trim().is_empty() {
        errors.add("name", "Name is required");
    } else {
        errors.ensure(
            name.trim().chars().count() <= NAME_MAX_LEN,
            "name",
            format!("Name must be at most {NAME_MAX_LEN} characters"),
        );
    }
}

/// Requests carrying a price pair and a stock level.
pub trait PricedRequest {
    fn sale_price(&self) -> Decimal;
    fn cost(&self) -> Decimal;
    fn stock(&self) -> i32;
}

impl PricedRequest for CreateProduct {
    fn sale_price(&self) -> Decimal {
        self.sale_price
    }

    fn cost(&self) -> Decimal {
        self.cost
    }

    fn stock(&self) -> i32 {
        self.stock
    }
}

impl PricedRequest for UpdateProduct {
    fn sale_price(&self) -> Decimal {
        self.sale_price
    }

    fn cost(&self) -> Decimal {
        self.cost
    }

    fn stock(&self) -> i32 {
        self.stock
    }
}

/// Prices and stock must not be negative.
pub struct PricingValidator;

#[async_trait]
impl<R> Validator<R> for PricingValidator
where
    R: crate::pipeline::Request + PricedRequest,
{
    async fn validate(&self, request: &R) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.ensure(
            request.sale_price() >= Decimal::ZERO,
            "sale_price",
            "Sale price must be greater than or equal to 0",
        );
        errors.ensure(
            request.cost() >= Decimal::ZERO,
            "cost",
            "Cost must be greater than or equal to 0",
        );
        errors.ensure(
            request.stock() >= 0,
            "stock",
            "Stock must be greater than or equal to 0",
        );
        errors
    }
}

pub struct CreateProductValidator;

#[async_trait]
impl Validator<CreateProduct> for CreateProductValidator {
    async fn validate(&self, request: &CreateProduct) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, &request.name);
        errors.ensure(!request.sku.trim().is_empty(), "sku", "SKU is required");
        errors
    }
}

pub struct UpdateProductValidator;

#[async_trait]
impl Validator<UpdateProduct> for UpdateProductValidator {
    async fn validate(&self, request: &UpdateProduct) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.ensure(!request.id.is_nil(), "id", "Id is required");
        check_name(&mut errors, &request.name);
        errors
    }
}

/// Rejects the nil id on requests that address one product.
pub struct ProductIdValidator;

macro_rules! product_id_rule {
    ($($request:ty),* $(,)?) => {
        $(
            #[async_trait]
            impl Validator<$request> for ProductIdValidator {
                async fn validate(&self, request: &$request) -> ValidationErrors {
                    let mut errors = ValidationErrors::new();
                    errors.ensure(!request.id.is_nil(), "id", "Id is required");
                    errors
                }
            }
        )*
    };
}

product_id_rule!(GetProductById, DeleteProduct, SetPriceLock);

pub struct ListProductsValidator;

#[async_trait]
impl Validator<ListProducts> for ListProductsValidator {
    async fn validate(&self, request: &ListProducts) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.ensure(
            request.page_number >= 1,
            "page_number",
            "Page number must be at least 1",
        );
        errors.ensure(
            (1..=ListProducts::MAX_PAGE_SIZE).contains(&request.page_size),
            "page_size",
            format!(
                "Page size must be between 1 and {}",
                ListProducts::MAX_PAGE_SIZE
            ),
        );
        if let Some(field) = &request.sort_field {
            errors.ensure(
                field.parse::<SortField>().is_ok(),
                "sort_field",
                "Sort field must be one of: name, price, sku, stock",
            );
        }
        if let Some(direction) = &request.sort_direction {
            errors.ensure(
                direction.parse::<SortDirection>().is_ok(),
                "sort_direction",
                "Sort direction must be asc or desc",
            );
        }
        errors
    }
}

pub struct SkuExistsValidator;

#[async_trait]
impl Validator<SkuExists> for SkuExistsValidator {
    async fn validate(&self, request: &SkuExists) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.ensure(!request.sku.trim().is_empty(), "sku", "SKU is required");
        errors
    }
}
