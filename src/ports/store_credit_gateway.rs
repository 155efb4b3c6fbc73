//! Store-credit gateway port for the commerce platform.
//!
//! The platform is the system of record for store-credit balances. This
//! system only reads balances and pushes credited totals; it never holds an
//! authoritative balance of its own.

use crate::domain::dashboard::StoreCreditBalance;
use crate::domain::foundation::{BatchId, DomainError, MemberId, Money};
use async_trait::async_trait;

/// Port for the commerce platform's store-credit API.
#[async_trait]
pub trait StoreCreditGateway: Send + Sync {
    /// Fetches the member's current balance.
    ///
    /// Implementations degrade to the last-known balance marked stale when
    /// the platform is unreachable; they only error when no balance was
    /// ever fetched.
    async fn fetch_balance(&self, member_id: MemberId)
        -> Result<StoreCreditBalance, DomainError>;

    /// Pushes a credited ledger total to the platform, one call per
    /// trade-in batch rather than per transaction.
    ///
    /// Must be idempotent on `(member_id, batch_id)`: the platform is
    /// eventually consistent and the push may be retried.
    ///
    /// # Errors
    ///
    /// - `ExternalUnavailable` when the platform is unreachable; the caller
    ///   retries with backoff and alerts on exhaustion
    async fn push_batch_credit(
        &self,
        member_id: MemberId,
        batch_id: BatchId,
        amount: Money,
    ) -> Result<(), DomainError>;
}
