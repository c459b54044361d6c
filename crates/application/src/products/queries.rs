//! Product queries.

use common::ProductId;
use serde::{Deserialize, Serialize};

use super::cache_keys;
use super::dto::{PagedResult, ProductDto, SkuAvailability};
use crate::pipeline::{CachePolicy, Request};

/// Loads one product. Responds with `None` if it does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProductById {
    pub id: ProductId,
}

impl Request for GetProductById {
    type Response = Option<ProductDto>;
    const NAME: &'static str = "GetProductById";

    fn cache_policy(&self) -> Option<CachePolicy> {
        Some(CachePolicy::new(cache_keys::product(self.id)))
    }
}

/// Lists products one page at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListProducts {
    pub page_number: u32,
    pub page_size: u32,
    #[serde(default)]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_direction: Option<String>,
}

impl ListProducts {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn first_page() -> Self {
        Self {
            page_number: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
            sort_field: None,
            sort_direction: None,
        }
    }
}

impl Request for ListProducts {
    type Response = PagedResult<ProductDto>;
    const NAME: &'static str = "ListProducts";

    fn cache_policy(&self) -> Option<CachePolicy> {
        Some(CachePolicy::new(cache_keys::list(
            self.page_number,
            self.page_size,
            self.sort_field.as_deref(),
            self.sort_direction.as_deref(),
        )))
    }
}

/// Checks whether a SKU is taken, after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuExists {
    pub sku: String,
}

impl Request for SkuExists {
    type Response = SkuAvailability;
    const NAME: &'static str = "SkuExists";
}
