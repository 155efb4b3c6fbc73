//! Loyalty program HTTP module.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::LoyaltyAppState;
pub use routes::{loyalty_router, member_routes, trade_in_routes, webhook_routes};
