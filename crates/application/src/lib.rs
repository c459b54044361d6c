//! Application layer for the product catalog.
//!
//! This crate provides:
//! - The request pipeline (logging, validation, caching, idempotency)
//! - Product commands, queries, validators and handlers
//! - Post-commit notifications and cache invalidation
//! - `CatalogService`, the entry point used by the HTTP layer

pub mod error;
pub mod events;
pub mod pipeline;
pub mod products;
pub mod service;

pub use error::{AppError, Result, ValidationErrors};
pub use events::{
    CacheInvalidationListener, DomainEventLogger, EventPublisher, InMemoryEventBus, Notification,
    NotificationListener,
};
pub use pipeline::{DataSource, Outcome, Served};
pub use service::{CatalogDeps, CatalogService, DEFAULT_CACHE_TTL, default_event_bus};
