//! Shared domain types and rules for the Warehouse Trade Management system
//!
//! This crate contains the models and the pure business rules (FIFO stock
//! allocation, order payment lifecycle) shared between the backend and its
//! tests. Nothing in here performs I/O.

pub mod allocation;
pub mod lifecycle;
pub mod models;
pub mod types;

pub use allocation::*;
pub use lifecycle::*;
pub use models::*;
pub use types::*;
