//! Bonus ledger store port.
//!
//! The ledger is append-only and idempotent on the transaction's key.
//! At-least-once delivery from the commerce platform means every append may
//! arrive more than once; `Duplicate` is a success, not an error.

use crate::domain::foundation::{BatchId, DomainError, MemberId, Money};
use crate::domain::ledger::BonusTransaction;
use async_trait::async_trait;

/// Result of an idempotent append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Entry was written.
    Committed,

    /// An entry with this idempotency key already exists; nothing changed.
    Duplicate,
}

impl AppendOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, AppendOutcome::Duplicate)
    }
}

/// Durable record of bonus transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends an entry, keyed on its idempotency key.
    ///
    /// A second append with the same key returns `Duplicate` and performs
    /// no state change.
    ///
    /// # Errors
    ///
    /// - `InvariantViolation` if the entry fails ledger invariants
    /// - `DatabaseError` on persistence failure
    async fn append(&self, entry: &BonusTransaction) -> Result<AppendOutcome, DomainError>;

    /// Lists a member's entries ordered by creation time descending.
    async fn list_by_member(
        &self,
        member_id: MemberId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<BonusTransaction>, DomainError>;

    /// Total bonus amount for a member, recomputed from the ledger.
    ///
    /// Display only. Never cached as a separate mutable field, so it cannot
    /// drift from the entries themselves.
    async fn sum_by_member(&self, member_id: MemberId) -> Result<Money, DomainError>;

    /// Total bonus amount recorded against one trade-in batch, used for
    /// the per-batch store-credit push.
    async fn sum_by_batch(&self, batch_id: BatchId) -> Result<Money, DomainError>;
}
