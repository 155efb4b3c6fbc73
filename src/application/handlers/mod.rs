//! Command and query handlers, one module per bounded concern.

pub mod bonus;
pub mod dashboard;
pub mod membership;
