//! In-memory bonus ledger.

use crate::domain::foundation::{BatchId, DomainError, MemberId, Money};
use crate::domain::ledger::{BonusTransaction, IdempotencyKey};
use crate::ports::{AppendOutcome, LedgerStore};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// In-memory `LedgerStore` with the same idempotency semantics as the
/// Postgres adapter's unique key index.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    entries: Mutex<Vec<BonusTransaction>>,
    keys: Mutex<HashSet<IdempotencyKey>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry in insertion order, for assertions.
    pub fn entries(&self) -> Vec<BonusTransaction> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, entry: &BonusTransaction) -> Result<AppendOutcome, DomainError> {
        if entry.amount.is_negative() {
            return Err(DomainError::invariant("negative ledger amount"));
        }

        let mut keys = self.keys.lock().unwrap();
        if !keys.insert(entry.idempotency_key.clone()) {
            return Ok(AppendOutcome::Duplicate);
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(AppendOutcome::Committed)
    }

    async fn list_by_member(
        &self,
        member_id: MemberId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<BonusTransaction>, DomainError> {
        let mut entries: Vec<BonusTransaction> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.member_id == member_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn sum_by_member(&self, member_id: MemberId) -> Result<Money, DomainError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.member_id == member_id)
            .map(|e| e.amount)
            .sum())
    }

    async fn sum_by_batch(&self, batch_id: BatchId) -> Result<Money, DomainError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.batch_id == Some(batch_id))
            .map(|e| e.amount)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::Creator;

    fn entry(member: i64, amount: i64, key: &str) -> BonusTransaction {
        BonusTransaction::promotion(
            MemberId::new(member),
            Money::from_cents(amount),
            IdempotencyKey::new(key).unwrap(),
            Creator::System,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_key_appends_once() {
        let store = InMemoryLedgerStore::new();
        let first = entry(1, 9_000, "sale-1");
        let second = entry(1, 9_000, "sale-1");

        assert_eq!(
            store.append(&first).await.unwrap(),
            AppendOutcome::Committed
        );
        assert_eq!(
            store.append(&second).await.unwrap(),
            AppendOutcome::Duplicate
        );
        assert_eq!(store.entries().len(), 1);
    }

    #[tokio::test]
    async fn sum_matches_listed_entries() {
        let store = InMemoryLedgerStore::new();
        store.append(&entry(1, 9_000, "a")).await.unwrap();
        store.append(&entry(1, 500, "b")).await.unwrap();
        store.append(&entry(2, 100, "c")).await.unwrap();

        let listed: Money = store
            .list_by_member(MemberId::new(1), 100, 0)
            .await
            .unwrap()
            .iter()
            .map(|e| e.amount)
            .sum();
        let total = store.sum_by_member(MemberId::new(1)).await.unwrap();

        assert_eq!(listed, total);
        assert_eq!(total, Money::from_cents(9_500));
    }

    #[tokio::test]
    async fn list_respects_limit_and_offset() {
        let store = InMemoryLedgerStore::new();
        for i in 0..5 {
            store
                .append(&entry(1, 100 * (i + 1), &format!("k{}", i)))
                .await
                .unwrap();
        }

        let page = store.list_by_member(MemberId::new(1), 2, 2).await.unwrap();
        assert_eq!(page.len(), 2);

        let rest = store.list_by_member(MemberId::new(1), 10, 4).await.unwrap();
        assert_eq!(rest.len(), 1);
    }
}
