//! Database models for the Warehouse Trade Management backend
//!
//! Re-exports models from the shared crate

pub use shared::models::*;
