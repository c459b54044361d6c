//! Wire types of the catalog API.

use common::{ProductId, RequestId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where the server got a query result from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cache,
    Source,
}

/// A query result with its provenance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Fetched<T> {
    pub data: T,
    pub source: Source,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub sale_price: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cost: Decimal,
    pub stock: i32,
    pub price_locked: bool,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub margin_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page_number: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SkuAvailability {
    pub sku: String,
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub sale_price: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cost: Decimal,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductUpdate {
    pub name: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub sale_price: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cost: Decimal,
    pub stock: i32,
}

/// Paging and sorting of a listing. Unset values use the server defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_field: Option<String>,
    pub sort_direction: Option<String>,
}

impl ListOptions {
    pub fn page(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number: Some(page_number),
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, field: &str, direction: &str) -> Self {
        self.sort_field = Some(field.to_string());
        self.sort_direction = Some(direction.to_string());
        self
    }

    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(n) = self.page_number {
            query.push(("pageNumber", n.to_string()));
        }
        if let Some(n) = self.page_size {
            query.push(("pageSize", n.to_string()));
        }
        if let Some(field) = &self.sort_field {
            query.push(("sortField", field.clone()));
        }
        if let Some(direction) = &self.sort_direction {
            query.push(("sortDirection", direction.clone()));
        }
        query
    }
}

/// Result of a command that may have been suppressed as a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome<T> {
    Completed(T),
    /// The server had already processed this idempotency key.
    AlreadyProcessed { request_id: Option<RequestId> },
}

impl<T> CommandOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            CommandOutcome::Completed(value) => Some(value),
            CommandOutcome::AlreadyProcessed { .. } => None,
        }
    }

    pub fn is_already_processed(&self) -> bool {
        matches!(self, CommandOutcome::AlreadyProcessed { .. })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Created {
    pub id: ProductId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Replay {
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_options_query_uses_camel_case() {
        let query = ListOptions::page(2, 10).sorted_by("price", "desc").to_query();
        assert_eq!(
            query,
            vec![
                ("pageNumber", "2".to_string()),
                ("pageSize", "10".to_string()),
                ("sortField", "price".to_string()),
                ("sortDirection", "desc".to_string()),
            ]
        );
        assert!(ListOptions::default().to_query().is_empty());
    }

    #[test]
    fn test_fetched_product_decodes() {
        let json = serde_json::json!({
            "data": {
                "id": "7f2c1a64-3f0e-4a53-9a57-2d1c1c1d8a10",
                "name": "Widget",
                "sku": "WID001",
                "sale_price": 19.99,
                "cost": 10.0,
                "stock": 5,
                "price_locked": false,
                "margin_percent": 49.97
            },
            "source": "cache",
            "elapsed_ms": 0
        });

        let fetched: Fetched<Product> = serde_json::from_value(json).unwrap();
        assert_eq!(fetched.source, Source::Cache);
        assert_eq!(fetched.data.sale_price, Decimal::new(1999, 2));
    }

    #[test]
    fn test_new_product_sends_exact_prices() {
        let product = NewProduct {
            name: "Vault".to_string(),
            sku: "VLT-001".to_string(),
            sale_price: rust_decimal_macros::dec!(9999999999999999.99),
            cost: rust_decimal_macros::dec!(0.01),
            stock: 1,
        };

        let body = serde_json::to_string(&product).unwrap();

        assert!(body.contains(r#""sale_price":9999999999999999.99"#));
        assert!(body.contains(r#""cost":0.01"#));
    }
}
