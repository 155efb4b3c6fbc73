//! SelectTierHandler - assigns a tier and opens payment-setup checkout.

use std::sync::Arc;

use crate::application::MemberLocks;
use crate::domain::member::{Member, MemberError, MemberStatus, Subscription};
use crate::ports::{
    CheckoutRequest, CheckoutSession, MemberRepository, PaymentProvider, SubscriptionRepository,
    TierRegistry,
};

/// Command to select a tier and start checkout.
#[derive(Debug, Clone)]
pub struct SelectTierCommand {
    pub member_id: crate::domain::foundation::MemberId,
    pub tier_id: crate::domain::foundation::TierId,
    pub success_url: String,
    pub cancel_url: String,
}

/// Result of a successful tier selection.
#[derive(Debug, Clone)]
pub struct SelectTierResult {
    pub member: Member,
    pub checkout_session: CheckoutSession,
}

/// Handler for tier selection.
///
/// Moves the member to `PendingPayment` and returns a hosted checkout URL.
/// Activation happens later, on the verified processor callback; the member
/// cannot self-declare active by following the redirect.
///
/// Also the re-entry point: a member whose checkout was abandoned, or whose
/// subscription was terminated upstream, restarts tier selection here rather
/// than through reactivation.
pub struct SelectTierHandler {
    locks: Arc<MemberLocks>,
    members: Arc<dyn MemberRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    tiers: Arc<dyn TierRegistry>,
    payments: Arc<dyn PaymentProvider>,
}

impl SelectTierHandler {
    pub fn new(
        locks: Arc<MemberLocks>,
        members: Arc<dyn MemberRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        tiers: Arc<dyn TierRegistry>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            locks,
            members,
            subscriptions,
            tiers,
            payments,
        }
    }

    pub async fn handle(&self, cmd: SelectTierCommand) -> Result<SelectTierResult, MemberError> {
        let _guard = self.locks.acquire(cmd.member_id).await;

        let mut member = self
            .members
            .find_by_id(cmd.member_id)
            .await?
            .ok_or_else(|| MemberError::not_found(cmd.member_id))?;

        let tier = self
            .tiers
            .get(cmd.tier_id)
            .await
            .map_err(|_| MemberError::tier_not_found(cmd.tier_id))?;
        if !tier.active {
            return Err(MemberError::tier_not_found(cmd.tier_id));
        }

        let existing = self.subscriptions.find_by_member(member.id).await?;

        // Stalled checkout or full upstream termination re-enters through a
        // fresh tier selection. A canceled member whose subscription is still
        // alive (scheduled cancellation in its paid period) goes through
        // reactivation instead; select_tier rejects them below.
        match member.status {
            MemberStatus::PendingPayment => member.restart_tier_selection()?,
            MemberStatus::Canceled
                if existing.as_ref().map_or(true, Subscription::is_terminated) =>
            {
                member.restart_tier_selection()?;
            }
            _ => {}
        }

        // External calls before any repository write, so a processor failure
        // leaves persisted state unchanged.
        let customer_id = match &existing {
            Some(existing) => existing.processor_customer_id.clone(),
            None => self
                .payments
                .create_customer(member.id, &member.email, member.name.as_deref())
                .await
                .map_err(|e| MemberError::payment_failed(e.message))?,
        };

        let checkout_session = self
            .payments
            .create_checkout_session(CheckoutRequest {
                member_id: member.id,
                customer_id: customer_id.clone(),
                email: member.email.clone(),
                monthly_price: tier.monthly_price,
                tier_name: tier.name.clone(),
                success_url: cmd.success_url,
                cancel_url: cmd.cancel_url,
                idempotency_key: Some(format!("checkout-{}-{}", member.id, tier.id)),
            })
            .await
            .map_err(|e| MemberError::payment_failed(e.message))?;

        member.select_tier(tier.id)?;

        let subscription_id = self.subscriptions.allocate_id().await?;
        let subscription = Subscription::start_checkout(subscription_id, member.id, customer_id);
        self.subscriptions.save(&subscription).await?;
        self.members.update(&member).await?;

        tracing::info!(
            member_id = %member.id,
            tier_id = %tier.id,
            session_id = %checkout_session.id,
            "tier selected, checkout session created"
        );

        Ok(SelectTierResult {
            member,
            checkout_session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryMemberRepository, InMemorySubscriptionRepository, InMemoryTierRegistry,
    };
    use crate::domain::foundation::{BonusRate, MemberId, Money, TierId, Timestamp};
    use crate::domain::member::{MemberStatus, PaymentStatus};
    use crate::domain::tier::{Tier, TierBenefits};
    use crate::ports::{
        PaymentError, PaymentErrorCode, ProcessorSubscription, WebhookEvent,
    };
    use async_trait::async_trait;

    struct MockPaymentProvider {
        fail_checkout: bool,
    }

    impl MockPaymentProvider {
        fn new() -> Self {
            Self {
                fail_checkout: false,
            }
        }

        fn failing_checkout() -> Self {
            Self { fail_checkout: true }
        }
    }

    #[async_trait]
    impl PaymentProvider for MockPaymentProvider {
        async fn create_customer(
            &self,
            member_id: MemberId,
            _email: &str,
            _name: Option<&str>,
        ) -> Result<String, PaymentError> {
            Ok(format!("cus_{}", member_id))
        }

        async fn create_checkout_session(
            &self,
            request: CheckoutRequest,
        ) -> Result<CheckoutSession, PaymentError> {
            if self.fail_checkout {
                return Err(PaymentError::new(
                    PaymentErrorCode::ProviderError,
                    "checkout failed",
                ));
            }
            Ok(CheckoutSession {
                id: format!("cs_{}", request.member_id),
                url: "https://checkout.example.com/cs_1".to_string(),
                expires_at: 1_700_000_000,
            })
        }

        async fn get_subscription(
            &self,
            _subscription_id: &str,
        ) -> Result<Option<ProcessorSubscription>, PaymentError> {
            Ok(None)
        }

        async fn cancel_subscription(
            &self,
            _subscription_id: &str,
            _at_period_end: bool,
        ) -> Result<ProcessorSubscription, PaymentError> {
            Err(PaymentError::not_found("subscription"))
        }

        async fn resume_subscription(
            &self,
            _subscription_id: &str,
        ) -> Result<ProcessorSubscription, PaymentError> {
            Err(PaymentError::not_found("subscription"))
        }

        async fn change_subscription_price(
            &self,
            _subscription_id: &str,
            _monthly_price: Money,
        ) -> Result<ProcessorSubscription, PaymentError> {
            Err(PaymentError::not_found("subscription"))
        }

        async fn verify_webhook(
            &self,
            _payload: &[u8],
            _signature: &str,
        ) -> Result<WebhookEvent, PaymentError> {
            Err(PaymentError::invalid_webhook("not implemented in mock"))
        }
    }

    fn gold_tier() -> Tier {
        Tier::new(
            TierId::new(1),
            "Gold",
            Money::from_cents(1_999),
            BonusRate::from_basis_points(6_000).unwrap(),
            14,
            TierBenefits::default(),
        )
        .unwrap()
    }

    struct Fixture {
        members: Arc<InMemoryMemberRepository>,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        handler: SelectTierHandler,
    }

    fn fixture(payments: MockPaymentProvider) -> Fixture {
        let members = Arc::new(InMemoryMemberRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let tiers = Arc::new(InMemoryTierRegistry::with_tiers(vec![gold_tier()]));
        let handler = SelectTierHandler::new(
            Arc::new(MemberLocks::new()),
            members.clone(),
            subscriptions.clone(),
            tiers,
            Arc::new(payments),
        );
        Fixture {
            members,
            subscriptions,
            handler,
        }
    }

    async fn signed_up_member(members: &InMemoryMemberRepository) -> Member {
        let id = members.allocate_id().await.unwrap();
        let member = Member::signup(id, "pat@example.com", None).unwrap();
        members.save(&member).await.unwrap();
        member
    }

    fn command(member_id: MemberId, tier_id: TierId) -> SelectTierCommand {
        SelectTierCommand {
            member_id,
            tier_id,
            success_url: "https://app.example.com/success".to_string(),
            cancel_url: "https://app.example.com/cancel".to_string(),
        }
    }

    #[tokio::test]
    async fn moves_member_to_pending_payment_with_checkout_url() {
        let f = fixture(MockPaymentProvider::new());
        let member = signed_up_member(&f.members).await;

        let result = f
            .handler
            .handle(command(member.id, TierId::new(1)))
            .await
            .unwrap();

        assert_eq!(result.member.status, MemberStatus::PendingPayment);
        assert_eq!(result.member.tier_id, Some(TierId::new(1)));
        assert!(result.checkout_session.url.contains("checkout"));

        let subscription = f
            .subscriptions
            .find_by_member(member.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(subscription.payment_status, PaymentStatus::Pending);
        assert!(subscription.processor_subscription_id.is_none());
    }

    #[tokio::test]
    async fn unknown_tier_is_configuration_error() {
        let f = fixture(MockPaymentProvider::new());
        let member = signed_up_member(&f.members).await;

        let result = f.handler.handle(command(member.id, TierId::new(404))).await;
        assert!(matches!(result, Err(MemberError::TierNotFound(_))));
    }

    #[tokio::test]
    async fn unknown_member_is_not_found() {
        let f = fixture(MockPaymentProvider::new());
        let result = f
            .handler
            .handle(command(MemberId::new(99), TierId::new(1)))
            .await;
        assert!(matches!(result, Err(MemberError::NotFound(_))));
    }

    #[tokio::test]
    async fn terminated_member_reenters_through_tier_selection() {
        let f = fixture(MockPaymentProvider::new());

        let id = f.members.allocate_id().await.unwrap();
        let mut member = Member::signup(id, "pat@example.com", None).unwrap();
        member.select_tier(TierId::new(1)).unwrap();
        member.activate().unwrap();
        member.cancel().unwrap();
        f.members.save(&member).await.unwrap();

        let sub_id = f.subscriptions.allocate_id().await.unwrap();
        let mut sub = Subscription::start_checkout(sub_id, id, "cus_old".into());
        sub.confirm(
            "sub_old".into(),
            Timestamp::now().minus_days(30),
            Timestamp::now(),
        )
        .unwrap();
        sub.cancel_now();
        sub.created_at = Timestamp::now().minus_days(30);
        f.subscriptions.save(&sub).await.unwrap();

        let result = f.handler.handle(command(id, TierId::new(1))).await.unwrap();

        assert_eq!(result.member.status, MemberStatus::PendingPayment);
        assert_eq!(result.member.tier_id, Some(TierId::new(1)));

        // New pending subscription on the existing processor customer.
        let latest = f.subscriptions.find_by_member(id).await.unwrap().unwrap();
        assert_eq!(latest.payment_status, PaymentStatus::Pending);
        assert_eq!(latest.processor_customer_id, "cus_old");
        assert!(latest.processor_subscription_id.is_none());
    }

    #[tokio::test]
    async fn abandoned_checkout_member_can_reselect_tier() {
        let f = fixture(MockPaymentProvider::new());
        let member = signed_up_member(&f.members).await;

        f.handler
            .handle(command(member.id, TierId::new(1)))
            .await
            .unwrap();

        // Checkout never completed; selecting again must not dead-end.
        let result = f
            .handler
            .handle(command(member.id, TierId::new(1)))
            .await
            .unwrap();
        assert_eq!(result.member.status, MemberStatus::PendingPayment);
    }

    #[tokio::test]
    async fn canceled_member_with_live_subscription_is_rejected() {
        let f = fixture(MockPaymentProvider::new());

        let id = f.members.allocate_id().await.unwrap();
        let mut member = Member::signup(id, "pat@example.com", None).unwrap();
        member.select_tier(TierId::new(1)).unwrap();
        member.activate().unwrap();
        member.cancel().unwrap();
        f.members.save(&member).await.unwrap();

        let sub_id = f.subscriptions.allocate_id().await.unwrap();
        let mut sub = Subscription::start_checkout(sub_id, id, "cus_1".into());
        sub.confirm(
            "sub_1".into(),
            Timestamp::now(),
            Timestamp::now().add_days(30),
        )
        .unwrap();
        sub.schedule_cancel();
        f.subscriptions.save(&sub).await.unwrap();

        let result = f.handler.handle(command(id, TierId::new(1))).await;
        assert!(matches!(result, Err(MemberError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn checkout_failure_leaves_member_unchanged() {
        let f = fixture(MockPaymentProvider::failing_checkout());
        let member = signed_up_member(&f.members).await;

        let result = f.handler.handle(command(member.id, TierId::new(1))).await;
        assert!(matches!(result, Err(MemberError::PaymentFailed { .. })));

        let reloaded = f.members.find_by_id(member.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, MemberStatus::PendingTierSelection);
        assert!(f
            .subscriptions
            .find_by_member(member.id)
            .await
            .unwrap()
            .is_none());
    }
}
