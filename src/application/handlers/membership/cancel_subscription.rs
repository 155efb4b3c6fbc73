//! CancelSubscriptionHandler - immediate or end-of-period cancellation.

use std::sync::Arc;

use crate::application::MemberLocks;
use crate::domain::foundation::MemberId;
use crate::domain::member::{Member, MemberError};
use crate::ports::{MemberRepository, PaymentProvider, SubscriptionRepository};

/// Command to cancel a subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub member_id: MemberId,

    /// When false, the subscription stays active until the period boundary
    /// and the reconciliation layer performs the final transition.
    pub immediate: bool,
}

/// Handler for cancellation.
pub struct CancelSubscriptionHandler {
    locks: Arc<MemberLocks>,
    members: Arc<dyn MemberRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentProvider>,
}

impl CancelSubscriptionHandler {
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

    pub async fn handle(&self, cmd: CancelSubscriptionCommand) -> Result<Member, MemberError> {
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
        let processor_id = subscription
            .processor_subscription_id
            .clone()
            .ok_or_else(|| MemberError::no_subscription(cmd.member_id))?;

        // Cancel upstream first; a processor failure must leave local state
        // untouched so the member can retry.
        self.payments
            .cancel_subscription(&processor_id, !cmd.immediate)
            .await
            .map_err(|e| MemberError::payment_failed(e.message))?;

        if cmd.immediate {
            subscription.cancel_now();
            member.cancel()?;
        } else {
            // Member stays in their current status until the boundary is
            // crossed by the reconciliation layer.
            subscription.schedule_cancel();
        }

        self.subscriptions.update(&subscription).await?;
        self.members.update(&member).await?;

        tracing::info!(
            member_id = %member.id,
            immediate = cmd.immediate,
            "subscription cancellation requested"
        );
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::test_support::RecordingPaymentProvider;
    use crate::adapters::memory::{InMemoryMemberRepository, InMemorySubscriptionRepository};
    use crate::domain::foundation::{SubscriptionId, TierId, Timestamp};
    use crate::domain::member::{MemberStatus, PaymentStatus, Subscription};

    struct Fixture {
        members: Arc<InMemoryMemberRepository>,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        payments: Arc<RecordingPaymentProvider>,
        handler: CancelSubscriptionHandler,
    }

    fn fixture(payments: RecordingPaymentProvider) -> Fixture {
        let members = Arc::new(InMemoryMemberRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let payments = Arc::new(payments);
        let handler = CancelSubscriptionHandler::new(
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

    async fn active_member(f: &Fixture) -> Member {
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
        f.subscriptions.save(&sub).await.unwrap();
        member
    }

    #[tokio::test]
    async fn scheduled_cancel_keeps_member_active() {
        let f = fixture(RecordingPaymentProvider::new());
        let member = active_member(&f).await;

        let result = f
            .handler
            .handle(CancelSubscriptionCommand {
                member_id: member.id,
                immediate: false,
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
        assert!(sub.cancel_at_period_end);
        assert_eq!(sub.payment_status, PaymentStatus::Paid);

        assert_eq!(f.payments.canceled(), vec![("sub_9".to_string(), true)]);
    }

    #[tokio::test]
    async fn immediate_cancel_terminates_member_and_subscription() {
        let f = fixture(RecordingPaymentProvider::new());
        let member = active_member(&f).await;

        let result = f
            .handler
            .handle(CancelSubscriptionCommand {
                member_id: member.id,
                immediate: true,
            })
            .await
            .unwrap();

        assert_eq!(result.status, MemberStatus::Canceled);
        // Tier retained for audit.
        assert!(result.tier_id.is_some());

        let sub = f
            .subscriptions
            .find_by_member(member.id)
            .await
            .unwrap()
            .unwrap();
        assert!(sub.is_terminated());

        assert_eq!(f.payments.canceled(), vec![("sub_9".to_string(), false)]);
    }

    #[tokio::test]
    async fn processor_failure_leaves_state_unchanged() {
        let f = fixture(RecordingPaymentProvider {
            fail_cancel: true,
            ..RecordingPaymentProvider::new()
        });
        let member = active_member(&f).await;

        let result = f
            .handler
            .handle(CancelSubscriptionCommand {
                member_id: member.id,
                immediate: true,
            })
            .await;
        assert!(matches!(result, Err(MemberError::PaymentFailed { .. })));

        let reloaded = f.members.find_by_id(member.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, MemberStatus::Active);
        let sub = f
            .subscriptions
            .find_by_member(member.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!sub.cancel_at_period_end);
        assert!(!sub.is_terminated());
    }

    #[tokio::test]
    async fn member_without_confirmed_subscription_cannot_cancel() {
        let f = fixture(RecordingPaymentProvider::new());
        let id = f.members.allocate_id().await.unwrap();
        let mut member = Member::signup(id, "pat@example.com", None).unwrap();
        member.select_tier(TierId::new(1)).unwrap();
        f.members.save(&member).await.unwrap();
        // Pending checkout, no processor subscription id yet.
        let sub = Subscription::start_checkout(SubscriptionId::new(1), id, "cus_1".into());
        f.subscriptions.save(&sub).await.unwrap();

        let result = f
            .handler
            .handle(CancelSubscriptionCommand {
                member_id: id,
                immediate: false,
            })
            .await;
        assert!(matches!(result, Err(MemberError::NoSubscription(_))));
    }
}
