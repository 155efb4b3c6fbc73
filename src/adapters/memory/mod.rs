//! In-memory adapter implementations.
//!
//! Used by handler tests and local development. Behavior mirrors the
//! Postgres adapters, including the email uniqueness constraint and the
//! idempotent ledger append.

mod ledger_store;
mod member_repository;
mod tier_registry;
mod trade_in_repository;

pub use ledger_store::InMemoryLedgerStore;
pub use member_repository::{InMemoryMemberRepository, InMemorySubscriptionRepository};
pub use tier_registry::InMemoryTierRegistry;
pub use trade_in_repository::InMemoryTradeInRepository;
