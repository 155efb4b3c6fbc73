//! In-memory member and subscription repositories.

use crate::domain::foundation::{DomainError, ErrorCode, MemberId, SubscriptionId};
use crate::domain::member::{Member, Subscription, TierChangeAudit};
use crate::ports::{MemberRepository, SubscriptionRepository};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// In-memory `MemberRepository`.
#[derive(Default)]
pub struct InMemoryMemberRepository {
    members: Mutex<HashMap<MemberId, Member>>,
    tier_changes: Mutex<Vec<TierChangeAudit>>,
    next_id: AtomicI64,
}

impl InMemoryMemberRepository {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
            tier_changes: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Recorded tier-change audit notes, oldest first.
    pub fn tier_changes(&self) -> Vec<TierChangeAudit> {
        self.tier_changes.lock().unwrap().clone()
    }
}

#[async_trait]
impl MemberRepository for InMemoryMemberRepository {
    async fn allocate_id(&self) -> Result<MemberId, DomainError> {
        Ok(MemberId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn save(&self, member: &Member) -> Result<(), DomainError> {
        let mut members = self.members.lock().unwrap();
        if members.values().any(|m| m.email == member.email) {
            return Err(DomainError::new(
                ErrorCode::MemberExists,
                format!("email {} is already registered", member.email),
            ));
        }
        members.insert(member.id, member.clone());
        Ok(())
    }

    async fn update(&self, member: &Member) -> Result<(), DomainError> {
        let mut members = self.members.lock().unwrap();
        if !members.contains_key(&member.id) {
            return Err(DomainError::new(
                ErrorCode::MemberNotFound,
                format!("member {} not found", member.id),
            ));
        }
        members.insert(member.id, member.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, DomainError> {
        Ok(self.members.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Member>, DomainError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .values()
            .find(|m| m.email == email)
            .cloned())
    }

    async fn record_tier_change(&self, audit: &TierChangeAudit) -> Result<(), DomainError> {
        self.tier_changes.lock().unwrap().push(audit.clone());
        Ok(())
    }
}

/// In-memory `SubscriptionRepository`.
#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: Mutex<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicI64,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn allocate_id(&self) -> Result<SubscriptionId, DomainError> {
        Ok(SubscriptionId::new(
            self.next_id.fetch_add(1, Ordering::SeqCst),
        ))
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if !subscriptions.contains_key(&subscription.id) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription {} not found", subscription.id),
            ));
        }
        subscriptions.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn find_by_member(
        &self,
        member_id: MemberId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.member_id == member_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn find_by_processor_id(
        &self,
        processor_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.processor_subscription_id.as_deref() == Some(processor_subscription_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn saved_member(repo: &InMemoryMemberRepository, email: &str) -> Member {
        let id = repo.allocate_id().await.unwrap();
        let member = Member::signup(id, email, None).unwrap();
        repo.save(&member).await.unwrap();
        member
    }

    #[tokio::test]
    async fn save_enforces_unique_email() {
        let repo = InMemoryMemberRepository::new();
        saved_member(&repo, "a@example.com").await;

        let id = repo.allocate_id().await.unwrap();
        let dup = Member::signup(id, "a@example.com", None).unwrap();
        let err = repo.save(&dup).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MemberExists);
    }

    #[tokio::test]
    async fn allocate_id_is_monotonic() {
        let repo = InMemoryMemberRepository::new();
        let a = repo.allocate_id().await.unwrap();
        let b = repo.allocate_id().await.unwrap();
        assert!(b.value() > a.value());
    }

    #[tokio::test]
    async fn update_requires_existing_member() {
        let repo = InMemoryMemberRepository::new();
        let member = Member::signup(MemberId::new(99), "x@example.com", None).unwrap();
        assert!(repo.update(&member).await.is_err());
    }

    #[tokio::test]
    async fn find_by_email_matches_exactly() {
        let repo = InMemoryMemberRepository::new();
        let member = saved_member(&repo, "a@example.com").await;

        let found = repo.find_by_email("a@example.com").await.unwrap();
        assert_eq!(found.map(|m| m.id), Some(member.id));
        assert!(repo.find_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn subscription_lookup_by_processor_id() {
        let repo = InMemorySubscriptionRepository::new();
        let id = repo.allocate_id().await.unwrap();
        let mut sub = Subscription::start_checkout(id, MemberId::new(1), "cus_1".into());
        sub.confirm(
            "sub_9".into(),
            crate::domain::foundation::Timestamp::now(),
            crate::domain::foundation::Timestamp::now().add_days(30),
        )
        .unwrap();
        repo.save(&sub).await.unwrap();

        let found = repo.find_by_processor_id("sub_9").await.unwrap();
        assert_eq!(found.map(|s| s.id), Some(id));
        assert!(repo.find_by_processor_id("sub_0").await.unwrap().is_none());
    }
}
