//! Persistence for the product catalog.
//!
//! Repositories are split into a read side ([`ProductReadRepository`]) and a
//! write side ([`ProductWriteRepository`]) whose changes are staged on a
//! [`ProductUnitOfWork`] and made durable by `save_changes`. Both sides, plus
//! the [`IdempotencyStore`], come in an in-memory and a PostgreSQL flavour.

pub mod error;
pub mod memory;
pub mod page;
pub mod postgres;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::{InMemoryIdempotencyStore, InMemoryProductStore, InMemoryUnitOfWork};
pub use page::{Page, PageRequest, SortDirection, SortField};
pub use postgres::{PostgresStore, PostgresUnitOfWork};
pub use repository::{
    IdempotencyStore, ProductReadRepository, ProductUnitOfWork, ProductWriteRepository,
};
