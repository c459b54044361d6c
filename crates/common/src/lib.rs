//! Shared identifier types for the product catalog workspace.

mod types;

pub use types::{ProductId, RequestId};
