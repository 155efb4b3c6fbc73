//! Routes verified payment-processor events into membership state.
//!
//! The processor is the source of truth for billing outcomes; this router is
//! the only writer that moves members between `Active`, `PastDue`, and
//! `Canceled` in response to billing. Events arrive already
//! signature-verified. Events we cannot attribute to a member are logged and
//! ignored rather than failed, so the processor does not redeliver them
//! forever.

use std::sync::Arc;

use crate::application::handlers::membership::{ConfirmPaymentCommand, ConfirmPaymentHandler};
use crate::application::MemberLocks;
use crate::domain::foundation::{DomainError, MemberId, Timestamp};
use crate::domain::member::{Member, MemberError, MemberStatus, Subscription};
use crate::ports::{
    MemberRepository, PaymentProvider, SubscriptionRepository, WebhookEvent, WebhookEventType,
};

/// What the router did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// State was updated.
    Applied,

    /// Event was valid but not actionable.
    Ignored(String),
}

/// Webhook event router.
pub struct WebhookRouter {
    locks: Arc<MemberLocks>,
    members: Arc<dyn MemberRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentProvider>,
    confirm_payment: Arc<ConfirmPaymentHandler>,
}

impl WebhookRouter {
    pub fn new(
        locks: Arc<MemberLocks>,
        members: Arc<dyn MemberRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentProvider>,
        confirm_payment: Arc<ConfirmPaymentHandler>,
    ) -> Self {
        Self {
            locks,
            members,
            subscriptions,
            payments,
            confirm_payment,
        }
    }

    /// Dispatches a verified event to the matching state update.
    pub async fn dispatch(
        &self,
        event: WebhookEvent,
    ) -> Result<WebhookDisposition, MemberError> {
        tracing::debug!(event_id = %event.id, event_type = ?event.event_type, "dispatching webhook event");

        match &event.event_type {
            WebhookEventType::CheckoutSessionCompleted => self.on_checkout_completed(&event).await,
            WebhookEventType::InvoicePaid => self.on_invoice_paid(&event).await,
            WebhookEventType::InvoicePaymentFailed => self.on_invoice_failed(&event).await,
            WebhookEventType::SubscriptionDeleted => self.on_subscription_deleted(&event).await,
            WebhookEventType::SubscriptionUpdated => self.on_subscription_updated(&event).await,
            WebhookEventType::Unknown(name) => {
                tracing::info!(event_id = %event.id, event_type = %name, "ignoring unhandled event type");
                Ok(WebhookDisposition::Ignored(format!(
                    "unhandled event type {}",
                    name
                )))
            }
        }
    }

    async fn on_checkout_completed(
        &self,
        event: &WebhookEvent,
    ) -> Result<WebhookDisposition, MemberError> {
        let Some(member_id) = event.member_id else {
            tracing::warn!(event_id = %event.id, "checkout event without member metadata, ignoring");
            return Ok(WebhookDisposition::Ignored(
                "checkout event carries no member id".to_string(),
            ));
        };

        let Some(subscription_id) = event.subscription_id.clone() else {
            return Ok(WebhookDisposition::Ignored(
                "checkout event carries no subscription id".to_string(),
            ));
        };

        // Checkout events do not carry the billing period; the processor's
        // subscription record is authoritative for it.
        let processor_sub = self
            .payments
            .get_subscription(&subscription_id)
            .await
            .map_err(|e| MemberError::from(DomainError::from(e)))?
            .ok_or_else(|| MemberError::no_subscription(member_id))?;

        self.confirm_payment
            .handle(ConfirmPaymentCommand {
                member_id,
                processor_subscription_id: subscription_id,
                period_start: to_timestamp(processor_sub.current_period_start),
                period_end: to_timestamp(processor_sub.current_period_end),
            })
            .await?;

        Ok(WebhookDisposition::Applied)
    }

    async fn on_invoice_paid(
        &self,
        event: &WebhookEvent,
    ) -> Result<WebhookDisposition, MemberError> {
        let Some((mut member, mut subscription, _guard)) = self.locate(event).await? else {
            return Ok(unattributable(event));
        };

        let (start, end) = billing_period(event, &subscription);
        subscription.record_payment(start, end);

        let recovered = member.status == MemberStatus::PastDue;
        if recovered {
            member.activate()?;
        }

        self.subscriptions.update(&subscription).await?;
        self.members.update(&member).await?;

        if recovered {
            tracing::info!(member_id = %member.id, "billing recovered, member active again");
        } else {
            tracing::info!(member_id = %member.id, "renewal invoice recorded");
        }
        Ok(WebhookDisposition::Applied)
    }

    async fn on_invoice_failed(
        &self,
        event: &WebhookEvent,
    ) -> Result<WebhookDisposition, MemberError> {
        let Some((mut member, mut subscription, _guard)) = self.locate(event).await? else {
            return Ok(unattributable(event));
        };

        subscription.mark_failed();
        if member.status == MemberStatus::Active {
            member.mark_past_due()?;
        }

        self.subscriptions.update(&subscription).await?;
        self.members.update(&member).await?;

        tracing::warn!(member_id = %member.id, "payment failed, member past due");
        Ok(WebhookDisposition::Applied)
    }

    async fn on_subscription_deleted(
        &self,
        event: &WebhookEvent,
    ) -> Result<WebhookDisposition, MemberError> {
        let Some((mut member, mut subscription, _guard)) = self.locate(event).await? else {
            return Ok(unattributable(event));
        };

        subscription.cancel_now();
        if member.status != MemberStatus::Canceled {
            member.cancel()?;
        }

        self.subscriptions.update(&subscription).await?;
        self.members.update(&member).await?;

        tracing::info!(member_id = %member.id, "subscription terminated upstream");
        Ok(WebhookDisposition::Applied)
    }

    async fn on_subscription_updated(
        &self,
        event: &WebhookEvent,
    ) -> Result<WebhookDisposition, MemberError> {
        let Some((member, mut subscription, _guard)) = self.locate(event).await? else {
            return Ok(unattributable(event));
        };

        let mut changed = false;

        if let Some(cancel_at_period_end) = event.cancel_at_period_end {
            if subscription.cancel_at_period_end != cancel_at_period_end {
                if cancel_at_period_end {
                    subscription.schedule_cancel();
                } else {
                    subscription.clear_scheduled_cancel();
                }
                changed = true;
            }
        }

        if let (Some(start), Some(end)) = (event.period_start, event.period_end) {
            let start = to_timestamp(start);
            let end = to_timestamp(end);
            if subscription.current_period_start != start
                || subscription.current_period_end != end
            {
                subscription.current_period_start = start;
                subscription.current_period_end = end;
                changed = true;
            }
        }

        if !changed {
            return Ok(WebhookDisposition::Ignored(
                "subscription attributes already in sync".to_string(),
            ));
        }

        subscription.updated_at = Timestamp::now();
        self.subscriptions.update(&subscription).await?;

        tracing::info!(member_id = %member.id, "subscription attributes synced");
        Ok(WebhookDisposition::Applied)
    }

    /// Resolves the member and subscription an event concerns, taking the
    /// member lock. Returns `None` when the event cannot be attributed.
    async fn locate(
        &self,
        event: &WebhookEvent,
    ) -> Result<Option<(Member, Subscription, tokio::sync::OwnedMutexGuard<()>)>, MemberError>
    {
        let member_id = match event.member_id {
            Some(id) => Some(id),
            None => self.member_from_subscription(event).await?,
        };

        let Some(member_id) = member_id else {
            return Ok(None);
        };

        let guard = self.locks.acquire(member_id).await;

        let Some(member) = self.members.find_by_id(member_id).await? else {
            return Ok(None);
        };
        let Some(subscription) = self.subscriptions.find_by_member(member_id).await? else {
            return Ok(None);
        };

        Ok(Some((member, subscription, guard)))
    }

    async fn member_from_subscription(
        &self,
        event: &WebhookEvent,
    ) -> Result<Option<MemberId>, MemberError> {
        let Some(subscription_id) = event.subscription_id.as_deref() else {
            return Ok(None);
        };
        let subscription = self
            .subscriptions
            .find_by_processor_id(subscription_id)
            .await?;
        Ok(subscription.map(|s| s.member_id))
    }
}

fn unattributable(event: &WebhookEvent) -> WebhookDisposition {
    tracing::warn!(
        event_id = %event.id,
        subscription_id = ?event.subscription_id,
        "event does not match any known member, ignoring"
    );
    WebhookDisposition::Ignored("event does not match any known member".to_string())
}

fn to_timestamp(unix_secs: i64) -> Timestamp {
    Timestamp::from_unix_secs(unix_secs.max(0) as u64)
}

/// The period the event reports, falling back to the stored period when the
/// event omits it.
fn billing_period(event: &WebhookEvent, subscription: &Subscription) -> (Timestamp, Timestamp) {
    match (event.period_start, event.period_end) {
        (Some(start), Some(end)) => (to_timestamp(start), to_timestamp(end)),
        _ => (
            subscription.current_period_start,
            subscription.current_period_end,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryMemberRepository, InMemorySubscriptionRepository};
    use crate::domain::foundation::{Money, TierId};
    use crate::ports::{
        CheckoutRequest, CheckoutSession, PaymentError, ProcessorSubscription,
        ProcessorSubscriptionStatus,
    };
    use async_trait::async_trait;

    struct StaticPaymentProvider {
        period_start: i64,
        period_end: i64,
    }

    #[async_trait]
    impl PaymentProvider for StaticPaymentProvider {
        async fn create_customer(
            &self,
            _member_id: MemberId,
            _email: &str,
            _name: Option<&str>,
        ) -> Result<String, PaymentError> {
            Ok("cus_static".to_string())
        }

        async fn create_checkout_session(
            &self,
            _request: CheckoutRequest,
        ) -> Result<CheckoutSession, PaymentError> {
            unimplemented!("not used by the router")
        }

        async fn get_subscription(
            &self,
            subscription_id: &str,
        ) -> Result<Option<ProcessorSubscription>, PaymentError> {
            Ok(Some(ProcessorSubscription {
                id: subscription_id.to_string(),
                customer_id: "cus_static".to_string(),
                status: ProcessorSubscriptionStatus::Active,
                current_period_start: self.period_start,
                current_period_end: self.period_end,
                cancel_at_period_end: false,
            }))
        }

        async fn cancel_subscription(
            &self,
            _subscription_id: &str,
            _at_period_end: bool,
        ) -> Result<ProcessorSubscription, PaymentError> {
            unimplemented!("not used by the router")
        }

        async fn resume_subscription(
            &self,
            _subscription_id: &str,
        ) -> Result<ProcessorSubscription, PaymentError> {
            unimplemented!("not used by the router")
        }

        async fn change_subscription_price(
            &self,
            _subscription_id: &str,
            _monthly_price: Money,
        ) -> Result<ProcessorSubscription, PaymentError> {
            unimplemented!("not used by the router")
        }

        async fn verify_webhook(
            &self,
            _payload: &[u8],
            _signature: &str,
        ) -> Result<WebhookEvent, PaymentError> {
            unimplemented!("not used by the router")
        }
    }

    struct Fixture {
        members: Arc<InMemoryMemberRepository>,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        router: WebhookRouter,
    }

    fn fixture() -> Fixture {
        let locks = Arc::new(MemberLocks::new());
        let members = Arc::new(InMemoryMemberRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let payments = Arc::new(StaticPaymentProvider {
            period_start: 1_700_000_000,
            period_end: 1_702_592_000,
        });
        let confirm_payment = Arc::new(ConfirmPaymentHandler::new(
            locks.clone(),
            members.clone(),
            subscriptions.clone(),
        ));

        let router = WebhookRouter::new(
            locks,
            members.clone(),
            subscriptions.clone(),
            payments,
            confirm_payment,
        );

        Fixture {
            members,
            subscriptions,
            router,
        }
    }

    fn event(event_type: WebhookEventType) -> WebhookEvent {
        WebhookEvent {
            id: "evt_1".to_string(),
            event_type,
            customer_id: Some("cus_1".to_string()),
            subscription_id: Some("sub_1".to_string()),
            session_id: None,
            member_id: None,
            period_start: None,
            period_end: None,
            cancel_at_period_end: None,
            created_at: 1_700_000_000,
        }
    }

    async fn pending_payment_member(f: &Fixture) -> MemberId {
        let id = f.members.allocate_id().await.unwrap();
        let mut member = Member::signup(id, "pat@example.com", None).unwrap();
        member.select_tier(TierId::new(1)).unwrap();
        f.members.save(&member).await.unwrap();

        let sub_id = f.subscriptions.allocate_id().await.unwrap();
        let sub = Subscription::start_checkout(sub_id, id, "cus_1".into());
        f.subscriptions.save(&sub).await.unwrap();
        id
    }

    async fn active_member(f: &Fixture) -> MemberId {
        let id = pending_payment_member(f).await;
        let mut event = event(WebhookEventType::CheckoutSessionCompleted);
        event.member_id = Some(id);
        f.router.dispatch(event).await.unwrap();
        id
    }

    #[tokio::test]
    async fn checkout_completed_activates_member() {
        let f = fixture();
        let id = pending_payment_member(&f).await;

        let mut evt = event(WebhookEventType::CheckoutSessionCompleted);
        evt.member_id = Some(id);

        let disposition = f.router.dispatch(evt).await.unwrap();
        assert_eq!(disposition, WebhookDisposition::Applied);

        let member = f.members.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(member.status, MemberStatus::Active);

        let sub = f.subscriptions.find_by_member(id).await.unwrap().unwrap();
        assert_eq!(sub.processor_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(
            sub.current_period_end,
            Timestamp::from_unix_secs(1_702_592_000)
        );
    }

    #[tokio::test]
    async fn checkout_without_member_metadata_is_ignored() {
        let f = fixture();
        pending_payment_member(&f).await;

        let evt = event(WebhookEventType::CheckoutSessionCompleted);
        let disposition = f.router.dispatch(evt).await.unwrap();
        assert!(matches!(disposition, WebhookDisposition::Ignored(_)));
    }

    #[tokio::test]
    async fn invoice_paid_refreshes_billing_period() {
        let f = fixture();
        let id = active_member(&f).await;

        let mut evt = event(WebhookEventType::InvoicePaid);
        evt.period_start = Some(1_702_592_000);
        evt.period_end = Some(1_705_184_000);

        let disposition = f.router.dispatch(evt).await.unwrap();
        assert_eq!(disposition, WebhookDisposition::Applied);

        let sub = f.subscriptions.find_by_member(id).await.unwrap().unwrap();
        assert_eq!(
            sub.current_period_start,
            Timestamp::from_unix_secs(1_702_592_000)
        );
        assert_eq!(
            sub.current_period_end,
            Timestamp::from_unix_secs(1_705_184_000)
        );
    }

    #[tokio::test]
    async fn invoice_paid_recovers_past_due_member() {
        let f = fixture();
        let id = active_member(&f).await;

        f.router
            .dispatch(event(WebhookEventType::InvoicePaymentFailed))
            .await
            .unwrap();
        let member = f.members.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(member.status, MemberStatus::PastDue);

        f.router
            .dispatch(event(WebhookEventType::InvoicePaid))
            .await
            .unwrap();
        let member = f.members.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(member.status, MemberStatus::Active);
    }

    #[tokio::test]
    async fn invoice_failure_marks_past_due() {
        let f = fixture();
        let id = active_member(&f).await;

        let disposition = f
            .router
            .dispatch(event(WebhookEventType::InvoicePaymentFailed))
            .await
            .unwrap();
        assert_eq!(disposition, WebhookDisposition::Applied);

        let member = f.members.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(member.status, MemberStatus::PastDue);
        assert!(member.tier_id.is_some());
    }

    #[tokio::test]
    async fn repeated_invoice_failures_are_idempotent() {
        let f = fixture();
        let id = active_member(&f).await;

        f.router
            .dispatch(event(WebhookEventType::InvoicePaymentFailed))
            .await
            .unwrap();
        f.router
            .dispatch(event(WebhookEventType::InvoicePaymentFailed))
            .await
            .unwrap();

        let member = f.members.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(member.status, MemberStatus::PastDue);
    }

    #[tokio::test]
    async fn subscription_deleted_cancels_member() {
        let f = fixture();
        let id = active_member(&f).await;

        let disposition = f
            .router
            .dispatch(event(WebhookEventType::SubscriptionDeleted))
            .await
            .unwrap();
        assert_eq!(disposition, WebhookDisposition::Applied);

        let member = f.members.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(member.status, MemberStatus::Canceled);

        let sub = f.subscriptions.find_by_member(id).await.unwrap().unwrap();
        assert!(sub.is_terminated());
    }

    #[tokio::test]
    async fn subscription_update_syncs_scheduled_cancel() {
        let f = fixture();
        let id = active_member(&f).await;

        let mut evt = event(WebhookEventType::SubscriptionUpdated);
        evt.cancel_at_period_end = Some(true);

        let disposition = f.router.dispatch(evt).await.unwrap();
        assert_eq!(disposition, WebhookDisposition::Applied);

        let sub = f.subscriptions.find_by_member(id).await.unwrap().unwrap();
        assert!(sub.cancel_at_period_end);

        // Member benefits continue until the boundary.
        let member = f.members.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(member.status, MemberStatus::Active);
    }

    #[tokio::test]
    async fn in_sync_subscription_update_is_ignored() {
        let f = fixture();
        active_member(&f).await;

        let mut evt = event(WebhookEventType::SubscriptionUpdated);
        evt.cancel_at_period_end = Some(false);

        let disposition = f.router.dispatch(evt).await.unwrap();
        assert!(matches!(disposition, WebhookDisposition::Ignored(_)));
    }

    #[tokio::test]
    async fn unknown_event_type_is_ignored() {
        let f = fixture();
        let disposition = f
            .router
            .dispatch(event(WebhookEventType::Unknown("payout.paid".to_string())))
            .await
            .unwrap();
        assert!(matches!(disposition, WebhookDisposition::Ignored(_)));
    }

    #[tokio::test]
    async fn event_for_unknown_subscription_is_ignored() {
        let f = fixture();
        let mut evt = event(WebhookEventType::InvoicePaid);
        evt.subscription_id = Some("sub_nobody".to_string());

        let disposition = f.router.dispatch(evt).await.unwrap();
        assert!(matches!(disposition, WebhookDisposition::Ignored(_)));
    }
}
