//! Product aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::{Product, ProductDraft};
pub use events::{ProductChangedData, ProductCreatedData, ProductEvent};
pub use state::ProductState;
