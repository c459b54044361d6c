//! Product commands, queries, validators and handlers.

pub mod cache_keys;
pub mod commands;
pub mod dto;
pub mod handlers;
pub mod queries;
pub mod validators;

pub use commands::{CreateProduct, DeleteProduct, SetPriceLock, UpdateProduct};
pub use dto::{PagedResult, ProductDto, SkuAvailability};
pub use handlers::ProductHandlers;
pub use queries::{GetProductById, ListProducts, SkuExists};
