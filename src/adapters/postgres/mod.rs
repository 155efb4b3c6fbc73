//! PostgreSQL implementations of the persistence ports.

mod ledger_store;
mod member_repository;
mod subscription_repository;
mod tier_registry;
mod trade_in_repository;

pub use ledger_store::PostgresLedgerStore;
pub use member_repository::PostgresMemberRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use tier_registry::PostgresTierRegistry;
pub use trade_in_repository::PostgresTradeInRepository;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Wraps a sqlx error as a `DatabaseError` with context.
pub(crate) fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, err))
}
