//! Product domain events.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a product aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    /// Product was created.
    ProductCreated(ProductCreatedData),

    /// Name, price, stock or price lock changed.
    ProductChanged(ProductChangedData),
}

impl ProductEvent {
    pub fn product_created(product_id: ProductId) -> Self {
        ProductEvent::ProductCreated(ProductCreatedData {
            product_id,
            occurred_at: Utc::now(),
        })
    }

    pub fn product_changed(product_id: ProductId) -> Self {
        ProductEvent::ProductChanged(ProductChangedData {
            product_id,
            occurred_at: Utc::now(),
        })
    }

    /// The product the event is about.
    pub fn product_id(&self) -> ProductId {
        match self {
            ProductEvent::ProductCreated(data) => data.product_id,
            ProductEvent::ProductChanged(data) => data.product_id,
        }
    }
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "ProductCreated",
            ProductEvent::ProductChanged(_) => "ProductChanged",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(data) => data.occurred_at,
            ProductEvent::ProductChanged(data) => data.occurred_at,
        }
    }
}

/// Data for ProductCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCreatedData {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Data for ProductChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductChangedData {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let id = ProductId::new();
        assert_eq!(ProductEvent::product_created(id).event_type(), "ProductCreated");
        assert_eq!(ProductEvent::product_changed(id).event_type(), "ProductChanged");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let id = ProductId::new();
        let json = serde_json::to_value(ProductEvent::product_changed(id)).unwrap();

        assert_eq!(json["type"], "ProductChanged");
        assert_eq!(json["data"]["product_id"], id.to_string());
    }
}
