//! ReactivateSubscriptionHandler - undoes a cancellation before it is final.
//!
//! Two cases are recoverable: a scheduled end-of-period cancellation that
//! has not crossed the boundary yet, and a locally canceled member whose
//! processor subscription still exists. Once the processor has fully
//! terminated the subscription, reactivation requires a fresh tier
//! selection instead.

use std::sync::Arc;

use crate::application::MemberLocks;
use crate::domain::foundation::MemberId;
use crate::domain::member::{Member, MemberError, MemberStatus};
use crate::ports::{MemberRepository, PaymentProvider, SubscriptionRepository};

/// Command to reactivate a subscription.
#[derive(Debug, Clone)]
pub struct ReactivateSubscriptionCommand {
    pub member_id: MemberId,
}

/// Handler for reactivation.
pub struct ReactivateSubscriptionHandler {
    locks: Arc<MemberLocks>,
    members: Arc<dyn MemberRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentProvider>,
}

impl ReactivateSubscriptionHandler {
    pub fn new(
        locks: Arc<MemberLocks>,
        members: Arc<dyn MemberRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            locks,
            members,
            subscriptions,
            payments,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReactivateSubscriptionCommand,
    ) -> Result<Member, MemberError> {
        let _guard = self.locks.acquire(cmd.member_id).await;

        let mut member = self
            .members
            .find_by_id(cmd.member_id)
            .await?
            .ok_or_else(|| MemberError::not_found(cmd.member_id))?;

        let mut subscription = self
            .subscriptions
            .find_by_member(cmd.member_id)
            .await?
            .ok_or_else(|| MemberError::no_subscription(cmd.member_id))?;

        let recoverable = subscription.cancel_at_period_end
            || (member.status == MemberStatus::Canceled && !subscription.is_terminated());
        if !recoverable {
            return Err(MemberError::NotScheduledForCancellation(cmd.member_id));
        }

        let processor_id = subscription
            .processor_subscription_id
            .clone()
            .ok_or_else(|| MemberError::no_subscription(cmd.member_id))?;

        self.payments
            .resume_subscription(&processor_id)
            .await
            .map_err(|e| MemberError::payment_failed(e.message))?;

        subscription.clear_scheduled_cancel();
        if member.status == MemberStatus::Canceled {
            member.activate()?;
        }

        self.subscriptions.update(&subscription).await?;
        self.members.update(&member).await?;

        tracing::info!(member_id = %member.id, "subscription reactivated");
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::test_support::RecordingPaymentProvider;
    use crate::adapters::memory::{InMemoryMemberRepository, InMemorySubscriptionRepository};
    use crate::domain::foundation::{SubscriptionId, TierId, Timestamp};
    use crate::domain::member::Subscription;

    struct Fixture {
        members: Arc<InMemoryMemberRepository>,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        payments: Arc<RecordingPaymentProvider>,
        handler: ReactivateSubscriptionHandler,
    }

    fn fixture() -> Fixture {
        let members = Arc::new(InMemoryMemberRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let payments = Arc::new(RecordingPaymentProvider::new());
        let handler = ReactivateSubscriptionHandler::new(
            Arc::new(MemberLocks::new()),
            members.clone(),
            subscriptions.clone(),
            payments.clone(),
        );
        Fixture {
            members,
            subscriptions,
            payments,
            handler,
        }
    }

    async fn member_with_subscription(f: &Fixture, scheduled_cancel: bool) -> Member {
        let id = f.members.allocate_id().await.unwrap();
        let mut member = Member::signup(id, "pat@example.com", None).unwrap();
        member.select_tier(TierId::new(1)).unwrap();
        member.activate().unwrap();
        f.members.save(&member).await.unwrap();

        let mut sub = Subscription::start_checkout(SubscriptionId::new(1), id, "cus_1".into());
        sub.confirm(
            "sub_9".into(),
            Timestamp::now(),
            Timestamp::now().add_days(30),
        )
        .unwrap();
        if scheduled_cancel {
            sub.schedule_cancel();
        }
        f.subscriptions.save(&sub).await.unwrap();
        member
    }

    #[tokio::test]
    async fn clears_scheduled_cancellation() {
        let f = fixture();
        let member = member_with_subscription(&f, true).await;

        let result = f
            .handler
            .handle(ReactivateSubscriptionCommand {
                member_id: member.id,
            })
            .await
            .unwrap();

        assert_eq!(result.status, MemberStatus::Active);
        let sub = f
            .subscriptions
            .find_by_member(member.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!sub.cancel_at_period_end);
        assert_eq!(f.payments.resumed(), vec!["sub_9".to_string()]);
    }

    #[tokio::test]
    async fn rejects_when_nothing_is_scheduled() {
        let f = fixture();
        let member = member_with_subscription(&f, false).await;

        let result = f
            .handler
            .handle(ReactivateSubscriptionCommand {
                member_id: member.id,
            })
            .await;
        assert!(matches!(
            result,
            Err(MemberError::NotScheduledForCancellation(_))
        ));
        assert!(f.payments.resumed().is_empty());
    }

    #[tokio::test]
    async fn terminated_subscription_requires_fresh_tier_selection() {
        let f = fixture();
        let member = member_with_subscription(&f, false).await;

        // Simulate the upstream termination having landed.
        let mut sub = f
            .subscriptions
            .find_by_member(member.id)
            .await
            .unwrap()
            .unwrap();
        sub.cancel_now();
        f.subscriptions.update(&sub).await.unwrap();
        let mut canceled = f.members.find_by_id(member.id).await.unwrap().unwrap();
        canceled.cancel().unwrap();
        f.members.update(&canceled).await.unwrap();

        let result = f
            .handler
            .handle(ReactivateSubscriptionCommand {
                member_id: member.id,
            })
            .await;
        assert!(matches!(
            result,
            Err(MemberError::NotScheduledForCancellation(_))
        ));
    }

    #[tokio::test]
    async fn canceled_member_with_live_subscription_reactivates() {
        let f = fixture();
        let member = member_with_subscription(&f, false).await;

        let mut canceled = f.members.find_by_id(member.id).await.unwrap().unwrap();
        canceled.cancel().unwrap();
        f.members.update(&canceled).await.unwrap();

        let result = f
            .handler
            .handle(ReactivateSubscriptionCommand {
                member_id: member.id,
            })
            .await
            .unwrap();
        assert_eq!(result.status, MemberStatus::Active);
    }
}
