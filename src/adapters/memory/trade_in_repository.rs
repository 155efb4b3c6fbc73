//! In-memory trade-in batch repository.

use crate::domain::foundation::{BatchId, DomainError, ErrorCode, MemberId};
use crate::domain::trade_in::TradeInBatch;
use crate::ports::TradeInRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// In-memory `TradeInRepository`.
#[derive(Default)]
pub struct InMemoryTradeInRepository {
    batches: Mutex<HashMap<BatchId, TradeInBatch>>,
    next_id: AtomicI64,
}

impl InMemoryTradeInRepository {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl TradeInRepository for InMemoryTradeInRepository {
    async fn allocate_id(&self) -> Result<BatchId, DomainError> {
        Ok(BatchId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn save(&self, batch: &TradeInBatch) -> Result<(), DomainError> {
        self.batches.lock().unwrap().insert(batch.id, batch.clone());
        Ok(())
    }

    async fn update(&self, batch: &TradeInBatch) -> Result<(), DomainError> {
        let mut batches = self.batches.lock().unwrap();
        if !batches.contains_key(&batch.id) {
            return Err(DomainError::new(
                ErrorCode::BatchNotFound,
                format!("batch {} not found", batch.id),
            ));
        }
        batches.insert(batch.id, batch.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: BatchId) -> Result<Option<TradeInBatch>, DomainError> {
        Ok(self.batches.lock().unwrap().get(&id).cloned())
    }

    async fn list_recent_by_member(
        &self,
        member_id: MemberId,
        limit: u32,
    ) -> Result<Vec<TradeInBatch>, DomainError> {
        let mut batches: Vec<TradeInBatch> = self
            .batches
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.member_id == member_id)
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        batches.truncate(limit as usize);
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn recent_batches_are_newest_first() {
        let repo = InMemoryTradeInRepository::new();
        for days_ago in [5i64, 1, 3] {
            let id = repo.allocate_id().await.unwrap();
            let batch = TradeInBatch::receive(
                id,
                MemberId::new(1),
                format!("TB-{}", days_ago),
                1,
                Timestamp::now().minus_days(days_ago),
            )
            .unwrap();
            repo.save(&batch).await.unwrap();
        }

        let recent = repo
            .list_recent_by_member(MemberId::new(1), 2)
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].reference_code, "TB-1");
        assert_eq!(recent[1].reference_code, "TB-3");
    }

    #[tokio::test]
    async fn update_requires_existing_batch() {
        let repo = InMemoryTradeInRepository::new();
        let batch = TradeInBatch::receive(
            BatchId::new(77),
            MemberId::new(1),
            "TB-77",
            1,
            Timestamp::now(),
        )
        .unwrap();
        assert!(repo.update(&batch).await.is_err());
    }
}
