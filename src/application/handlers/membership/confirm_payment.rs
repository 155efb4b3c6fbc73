//! ConfirmPaymentHandler - activates a membership after verified payment setup.
//!
//! Invoked only by the reconciliation layer once the processor's checkout
//! callback has been signature-verified. This is the single path from
//! `PendingPayment` into `Active`.

use std::sync::Arc;

use crate::application::MemberLocks;
use crate::domain::foundation::{MemberId, Timestamp};
use crate::domain::member::{Member, MemberError};
use crate::ports::{MemberRepository, SubscriptionRepository};

/// Command carrying the verified payment-setup confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmPaymentCommand {
    pub member_id: MemberId,
    pub processor_subscription_id: String,
    pub period_start: Timestamp,
    pub period_end: Timestamp,
}

/// Handler for payment-setup confirmation.
pub struct ConfirmPaymentHandler {
    locks: Arc<MemberLocks>,
    members: Arc<dyn MemberRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl ConfirmPaymentHandler {
    pub fn new(
        locks: Arc<MemberLocks>,
        members: Arc<dyn MemberRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            locks,
            members,
            subscriptions,
        }
    }

    pub async fn handle(&self, cmd: ConfirmPaymentCommand) -> Result<Member, MemberError> {
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

        subscription.confirm(
            cmd.processor_subscription_id,
            cmd.period_start,
            cmd.period_end,
        )?;
        member.activate()?;

        self.subscriptions.update(&subscription).await?;
        self.members.update(&member).await?;

        tracing::info!(
            member_id = %member.id,
            subscription_id = %subscription.id,
            "membership activated"
        );
        Ok(member)
    }
}
