//! HTTP handlers for the Warehouse Trade Management backend

pub mod client;
pub mod health;
pub mod order;
pub mod stock;

pub use client::*;
pub use health::*;
pub use order::*;
pub use stock::*;
