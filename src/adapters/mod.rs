//! Adapters implementing the ports against real infrastructure.

pub mod http;
pub mod memory;
pub mod postgres;
pub mod reconciliation;
pub mod shopify;
pub mod stripe;
