//! QuickFlip Loyalty - membership lifecycle and bonus ledger engine.
//!
//! Backend for a merchant loyalty program: tiered paid memberships, an
//! idempotent bonus ledger driven by trade-in sales, store-credit pushes to
//! the commerce platform, and payment-processor reconciliation.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
