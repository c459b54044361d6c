//! Domain layer for the product catalog.
//!
//! This crate provides the core domain abstractions including:
//! - `AggregateRoot` and `DomainEvent` traits plus the pending-event queue
//! - `Money` and `Sku` value objects
//! - `Product` aggregate whose mutations all run through a guarded draft

pub mod aggregate;
pub mod error;
pub mod product;
pub mod value_objects;

pub use aggregate::{AggregateRoot, DomainEvent, PendingEvents};
pub use common::ProductId;
pub use error::DomainError;
pub use product::{
    Product, ProductChangedData, ProductCreatedData, ProductDraft, ProductEvent, ProductState,
};
pub use value_objects::{Money, Sku};
