//! Product commands.

use common::{ProductId, RequestId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pipeline::Request;

/// Creates a product. Responds with the new id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub sku: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub sale_price: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cost: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

impl Request for CreateProduct {
    type Response = ProductId;
    const NAME: &'static str = "CreateProduct";

    fn idempotency_id(&self) -> Option<RequestId> {
        self.request_id
    }
}

/// Replaces name, prices and stock of an existing product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub sale_price: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cost: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

impl Request for UpdateProduct {
    type Response = ();
    const NAME: &'static str = "UpdateProduct";

    fn idempotency_id(&self) -> Option<RequestId> {
        self.request_id
    }
}

/// Locks or unlocks the price of an existing product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPriceLock {
    pub id: ProductId,
    pub locked: bool,
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

impl Request for SetPriceLock {
    type Response = ();
    const NAME: &'static str = "SetPriceLock";

    fn idempotency_id(&self) -> Option<RequestId> {
        self.request_id
    }
}

/// Deletes an existing product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProduct {
    pub id: ProductId,
}

impl Request for DeleteProduct {
    type Response = ();
    const NAME: &'static str = "DeleteProduct";
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_create_body_keeps_every_decimal_digit() {
        let json = r#"{
            "name": "Vault",
            "sku": "VLT-001",
            "sale_price": 9999999999999999.99,
            "cost": "12.50",
            "stock": 1
        }"#;

        let command: CreateProduct = serde_json::from_str(json).unwrap();

        assert_eq!(command.sale_price, dec!(9999999999999999.99));
        assert_eq!(command.cost, dec!(12.50));
        assert_eq!(command.request_id, None);
    }
}
