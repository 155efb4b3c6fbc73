//! HTTP surface: axum routes, DTOs, and error mapping.

pub mod loyalty;

pub use loyalty::{loyalty_router, LoyaltyAppState};
