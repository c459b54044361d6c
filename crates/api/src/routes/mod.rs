//! HTTP route handlers.

pub mod products;
pub mod system;
