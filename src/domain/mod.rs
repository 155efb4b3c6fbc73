//! Domain layer: entities, value objects, and pure business rules.
//!
//! No I/O happens here. Persistence and external collaborators are reached
//! through the traits in `crate::ports`.

pub mod dashboard;
pub mod foundation;
pub mod ledger;
pub mod member;
pub mod tier;
pub mod trade_in;
