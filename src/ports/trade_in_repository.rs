//! Trade-in batch repository port.

use crate::domain::foundation::{BatchId, DomainError, MemberId};
use crate::domain::trade_in::TradeInBatch;
use async_trait::async_trait;

/// Repository port for trade-in batch persistence.
#[async_trait]
pub trait TradeInRepository: Send + Sync {
    /// Allocates the next batch id.
    async fn allocate_id(&self) -> Result<BatchId, DomainError>;

    /// Saves a new batch.
    async fn save(&self, batch: &TradeInBatch) -> Result<(), DomainError>;

    /// Updates an existing batch.
    ///
    /// # Errors
    ///
    /// - `BatchNotFound` if the batch doesn't exist
    async fn update(&self, batch: &TradeInBatch) -> Result<(), DomainError>;

    /// Finds a batch by id. Returns `None` if not found.
    async fn find_by_id(&self, id: BatchId) -> Result<Option<TradeInBatch>, DomainError>;

    /// Lists a member's most recent batches, newest first.
    async fn list_recent_by_member(
        &self,
        member_id: MemberId,
        limit: u32,
    ) -> Result<Vec<TradeInBatch>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn trade_in_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn TradeInRepository) {}
    }
}
